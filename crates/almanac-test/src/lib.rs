//! Almanac events calendar - test support.
//!
//! In-memory stand-ins for the persistence, HTTP and media seams of the
//! service layer, plus fixtures. Integration tests under `tests/` run the
//! services against them.

pub mod fixtures;
pub mod memory_assets;
pub mod memory_store;
pub mod stub_fetcher;

pub use memory_assets::MemoryAssets;
pub use memory_store::MemoryStore;
pub use stub_fetcher::StubFetcher;
