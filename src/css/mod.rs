//! CSS handling: tolerant parsing, head/inline partitioning, usage
//! scanning, dead-rule pruning, and best-effort minification.

pub mod document;
pub mod minify;
pub mod partition;
pub mod prune;
pub mod usage;

pub use document::{CssDocument, CssNode};
pub use partition::{CssPartition, split_css};
pub use prune::{prune_css, strip_empty_at_rules};
pub use usage::{UsageSet, collect_used_selectors};
