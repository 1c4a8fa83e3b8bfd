//! Read-only access to the clinic analytics API.
//!
//! Individual requests never fail: an unavailable source is an absent
//! snapshot, and fan-outs settle every request before returning.

pub mod client;
pub mod fanout;
pub mod source;

pub use client::{AnalyticsSource, UpstreamClient};
pub use fanout::{settle_all, SnapshotSet};
pub use source::{Source, SourceRequest};
