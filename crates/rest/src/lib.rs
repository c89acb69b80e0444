//! Document-store REST client for the chunked upload protocol.
//!
//! [`Folder`] implements [`chunkup_upload::RemoteSession`] on top of the
//! store's `Files/Add`, `StartUpload`, `ContinueUpload`, `FinishUpload`
//! and `CancelUpload` endpoints.

pub mod client;
pub mod odata;

pub use client::{Client, Error, Folder};
pub use odata::{MetadataMode, normalize_item, parse_metadata, parse_offset};
