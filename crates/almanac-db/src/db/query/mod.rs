//! Query builder functions, one module per table.

pub mod category;
pub mod event;
pub mod occurrence;
