//! Calendar computations.
//!
//! ## Module Organization
//!
//! - `recurrence`: the start/end/repeat value type of one occurrence
//! - `expand`: turning an occurrence into concrete instances within a window
//! - `query`: filtering, merging and deduplicating instances across occurrences
//! - `pagination`: page slicing with a bounded set of page links
//! - `views`: month grid, event list and upcoming feed
//! - `display`: human readable spans and outbound calendar/map links

pub mod display;
pub mod expand;
pub mod pagination;
pub mod query;
pub mod recurrence;
pub mod views;
