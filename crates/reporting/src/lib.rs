//! Clinic funnel reporting: metric reconciliation across partially failing
//! sources, funnel derivation, and bottleneck diagnosis.

pub mod bottleneck;
pub mod dashboard;
pub mod funnel;
pub mod reconcile;

pub use bottleneck::{diagnose, merge_upstream, Diagnosis};
pub use dashboard::FunnelDashboard;
pub use funnel::{build_edges, build_stages};
pub use reconcile::{percent, reconcile};
