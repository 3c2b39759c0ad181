//! Consumer-facing operations over the pkghub package index.
//!
//! [`HubContext`] wires the configuration to an index source and archive
//! resolver; the free functions in [`search`], [`details`] and
//! [`featured`] work on plain package lists and can be used without it.

pub mod context;
pub mod details;
pub mod error;
pub mod featured;
pub mod search;

pub use context::HubContext;
pub use details::{resolve_package_details, select_version, PackageDetails};
pub use error::{OperationError, Result};
pub use featured::is_featured;
pub use search::{
    apply_filters, count_tags, filter_by_tags, text_search, text_search_with_threshold, TagCount,
};
