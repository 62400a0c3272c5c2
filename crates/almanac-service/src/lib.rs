//! Event calendar services.
//!
//! ## Module Organization
//!
//! - `calendar`: recurrence expansion, occurrence queries and the grid/list/upcoming presentations
//! - `category`: category administration
//! - `event`: event lookup and duplication
//! - `export`: the JSON representation other installations import from
//! - `import`: importing events published by other installations

pub mod calendar;
pub mod category;
pub mod error;
pub mod event;
pub mod export;
pub mod import;
