//! Importing events published by other installations.
//!
//! ## Summary
//! An import runs in three phases:
//!
//! 1. [`pipeline::fetch_event_data`]: fetch the public page, discover and fetch
//!    its JSON representation. No writes.
//! 2. [`pipeline::prepare_import`]: convert and validate the payload, then
//!    side-fetch the featured image. A failed image fetch only drops the image.
//! 3. [`pipeline::commit_import`]: insert the event and then its occurrences.
//!
//! Outbound requests go through [`fetch::Fetcher`] and stored media through
//! [`assets::AssetStorage`] so both can be replaced in tests.

pub mod assets;
pub mod fetch;
pub mod pipeline;

pub use assets::{AssetStorage, FsAssetStorage};
pub use fetch::{FetchedResponse, Fetcher, ReqwestFetcher};
pub use pipeline::{EventData, ImportSettings, PreparedImport, import_event};
