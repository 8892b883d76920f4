//! Shared request context.

use crate::analysis::TOP_CONTRIBUTORS_LIMIT;
use crate::config::DashboardConfig;
use crate::store::SnapshotStore;
use std::sync::Arc;

/// Shared, immutable request context.
///
/// Holds no snapshot data: every handler reads fresh collections.
pub struct State {
    pub store: Arc<dyn SnapshotStore>,
    /// Always within `1..=TOP_CONTRIBUTORS_LIMIT`.
    pub top_contributors: usize,
}

impl State {
    pub fn new(store: Arc<dyn SnapshotStore>, dashboard: &DashboardConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            top_contributors: dashboard.top_contributors.clamp(1, TOP_CONTRIBUTORS_LIMIT),
        })
    }
}
