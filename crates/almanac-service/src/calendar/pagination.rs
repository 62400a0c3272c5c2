//! Page slicing for listings.

use serde::Serialize;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub number: usize,
    pub num_pages: usize,
    /// Total number of items across all pages.
    pub count: usize,
    /// Page numbers to offer as links, at most `max_paging_links` of them around `number`.
    pub visible_page_range: Vec<usize>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    /// Maps the items, keeping the page geometry.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            visible_page_range: self.visible_page_range,
        }
    }
}

/// ## Summary
/// Returns page `page_num` of `items`.
///
/// A page number that is not a number selects page 1; one outside the
/// available pages selects the last page. With `per_page == 0` everything is on
/// one page. When there are more pages than `max_paging_links`, the visible range
/// is a window of `max_paging_links` pages roughly centred on the current one.
#[must_use]
pub fn paginate<T>(
    items: Vec<T>,
    page_num: Option<&str>,
    per_page: usize,
    max_paging_links: usize,
) -> Page<T> {
    let count = items.len();
    let per_page = if per_page == 0 { count.max(1) } else { per_page };
    let num_pages = count.div_ceil(per_page).max(1);

    let requested = page_num
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map_or(Some(1), |raw| raw.parse::<i64>().ok().or(Some(1)));
    let number = match requested.and_then(|n| usize::try_from(n).ok()) {
        Some(n) if (1..=num_pages).contains(&n) => n,
        _ => num_pages,
    };

    let items: Vec<T> = items
        .into_iter()
        .skip((number - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        number,
        num_pages,
        count,
        visible_page_range: visible_page_range(number, num_pages, max_paging_links),
    }
}

fn visible_page_range(number: usize, num_pages: usize, max_paging_links: usize) -> Vec<usize> {
    if max_paging_links == 0 || num_pages <= max_paging_links {
        return (1..=num_pages).collect();
    }
    let offset = (num_pages - max_paging_links)
        .min(number.saturating_sub(max_paging_links / 2 + 1));
    (offset + 1..=offset + max_paging_links).collect()
}
