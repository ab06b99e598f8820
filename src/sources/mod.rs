//! Artifact sources.
//!
//! The remote catalog lists what has been published; the transport fetches
//! both the catalog document and the archives it points at.

pub mod catalog;
pub mod http;

pub use catalog::{Catalog, CatalogClient, CatalogEntry, CatalogKeys};
pub use http::{HttpTransport, Transport};
