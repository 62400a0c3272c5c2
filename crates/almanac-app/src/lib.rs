//! HTTP surface of the calendar.
//!
//! ## Module Organization
//!
//! - `app`: routes and handlers
//! - `config`, `db_handler`, `fetch_handler`: hoops that place shared state in the depot
//! - `middleware`: per-request context
//! - `error`: mapping of failures to responses

pub mod app;
pub mod config;
pub mod db_handler;
pub mod error;
pub mod fetch_handler;
pub mod middleware;
