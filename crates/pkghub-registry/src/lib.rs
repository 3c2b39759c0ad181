//! Package index and archive handling for pkghub.
//!
//! This crate turns the hub's remote package index into a validated,
//! version-ordered model and resolves individual packages into their
//! archive contents.
//!
//! # Overview
//!
//! - **Ingestion**: [`PackagesIndex`] decodes the index document. Invalid
//!   entries are dropped one by one and logged; a malformed document is an
//!   error.
//! - **Ordering**: [`order_by_version`] and [`group_by_version`] build the
//!   non-empty, newest-first views used for display.
//! - **Fetching**: [`IndexSource`] downloads the index once and shares it
//!   through an [`IndexCache`], coalescing concurrent requests.
//! - **Archives**: [`ArchiveResolver`] downloads a package's zip archive
//!   and extracts a [`PackageRepo`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pkghub_registry::{
//!     group_by_version, ClientConfig, HttpFetcher, IndexCache, IndexSource,
//! };
//!
//! async fn list(url: &str) -> pkghub_registry::Result<()> {
//!     let fetcher = Arc::new(HttpFetcher::new(&ClientConfig::default()));
//!     let source = IndexSource::new(url, fetcher, IndexCache::new());
//!
//!     let index = source.get_packages_index().await?;
//!     for (name, versions) in group_by_version(index.packages.clone())?.iter() {
//!         println!("{name} {}", versions.latest().version);
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod asset;
pub mod cache;
pub mod error;
pub mod http_client;
pub mod index;
pub mod manifest;
pub mod metadata;
pub mod nonempty;
pub mod ordering;
pub mod package;
pub mod version;

pub use archive::{
    extract_package_repo, resolve_archive_bytes, ArchiveEntries, ArchiveResolver, PackageRepo,
    SourceFile, ZipEntries, MAX_ENTRY_BYTES,
};
pub use asset::{AssetRef, GithubUrl};
pub use cache::IndexCache;
pub use error::{ErrorKind, RegistryError, Result};
pub use http_client::{fetch_async, ClientConfig, Fetcher, HttpFetcher};
pub use index::{PackagesIndex, SENTINEL_PACKAGE};
pub use manifest::PackageManifest;
pub use metadata::{fetch_packages_index, IndexSource};
pub use nonempty::NonEmpty;
pub use ordering::{
    group_by_version, latest_per_name, order_by_version, GroupedByVersion, OrderedByVersion,
};
pub use package::{Package, RawPackage};
pub use version::{compare_versions, PackageVersion};
