//! Discovery of an event's machine-readable representation.
//!
//! A public event page advertises its JSON export with
//! `<link rel="alternate" type="application/json" href="...">`. The href may be
//! absolute or site-relative; relative hrefs resolve against the page's origin.

use std::sync::LazyLock;

use regex_lite::Regex;
use reqwest::Url;

use crate::error::{InterchangeError, InterchangeResult};

/// Media type advertised by the alternate link.
pub const JSON_MEDIA_TYPE: &str = "application/json";

#[expect(clippy::unwrap_used, reason = "pattern is a literal")]
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:link|a)\b[^>]*>").unwrap());

/// Markup a browser never treats as live elements: comments and the bodies of
/// `script` and `template`.
#[expect(clippy::unwrap_used, reason = "pattern is a literal")]
static INERT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?(?:-->|$)|<script\b.*?(?:</script\s*>|$)|<template\b.*?(?:</template\s*>|$)")
        .unwrap()
});

#[expect(clippy::unwrap_used, reason = "pattern is a literal")]
static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .unwrap()
});

/// Attribute name/value pairs of one tag, names lowercased.
fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTRIBUTE_PATTERN
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            Some((name, unescape(value)))
        })
        .collect()
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Escapes text for use in HTML content and quoted attribute values.
#[must_use]
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// ## Summary
/// Finds the href of the first alternate JSON link in an HTML document.
///
/// `rel` is a whitespace separated token list and must contain `alternate`;
/// `type` must be `application/json`. Both compare case-insensitively.
/// Links inside comments, `script` or `template` are not considered.
#[must_use]
pub fn find_alternate_json(html: &str) -> Option<String> {
    let live = INERT_PATTERN.replace_all(html, "");
    TAG_PATTERN.find_iter(&live).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        let get = |name: &str| {
            attrs
                .iter()
                .find(|(attr, _)| attr == name)
                .map(|(_, value)| value.as_str())
        };

        let is_alternate = get("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("alternate"))
        });
        let is_json = get("type").is_some_and(|ty| ty.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE));

        if is_alternate && is_json {
            get("href").map(str::to_string)
        } else {
            None
        }
    })
}

/// ## Summary
/// Resolves an alternate-link href into an absolute URL.
///
/// Absolute `http`/`https` hrefs are used as-is; anything else is joined onto the
/// origin (scheme, host and port) of `page_url`.
///
/// ## Errors
/// Returns `DiscoveryError` if the href cannot be parsed or the page has no origin.
pub fn resolve_json_url(page_url: &Url, href: &str) -> InterchangeResult<Url> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return Url::parse(href)
            .map_err(|e| InterchangeError::DiscoveryError(format!("invalid JSON URL '{href}': {e}")));
    }

    let origin = page_url.origin();
    if !origin.is_tuple() {
        return Err(InterchangeError::DiscoveryError(format!(
            "page URL '{page_url}' has no origin"
        )));
    }

    Url::parse(&origin.ascii_serialization())
        .and_then(|base| base.join(href))
        .map_err(|e| InterchangeError::DiscoveryError(format!("invalid JSON URL '{href}': {e}")))
}

/// ## Summary
/// Locates and resolves the JSON representation advertised by a fetched page.
///
/// ## Errors
/// Returns `DiscoveryError` if the page has no alternate JSON link, or the link
/// cannot be resolved.
pub fn discover_json_url(page_url: &Url, html: &str) -> InterchangeResult<Url> {
    let href = find_alternate_json(html).ok_or_else(|| {
        InterchangeError::DiscoveryError("no alternate application/json link".to_string())
    })?;
    tracing::debug!(href = %href, "Found alternate JSON link");
    resolve_json_url(page_url, &href)
}

/// ## Summary
/// Renders the `<link>` element that advertises `href` as an event's JSON representation.
#[must_use]
pub fn alternate_link_tag(href: &str) -> String {
    format!(
        r#"<link rel="alternate" type="{JSON_MEDIA_TYPE}" href="{}">"#,
        escape_html(href)
    )
}
