use tracing::{debug, instrument, warn};

use crate::api::AdminApi;
use crate::error::ClientError;
use crate::flag::{Counters, FeatureFlag};
use crate::merge::{duplicate_names, merge_overrides};

/// One merged view of the synchronizer: flags with overrides applied, plus its counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub flags: Vec<FeatureFlag>,
    pub counters: Counters,
}

impl Snapshot {
    pub fn flag(&self, name: &str) -> Option<&FeatureFlag> {
        // flags are sorted by name
        self.flags
            .binary_search_by(|f| f.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.flags[i])
    }

    pub fn overridden_count(&self) -> usize {
        self.flags.iter().filter(|f| f.is_overridden).count()
    }
}

/// Reads flags and overrides concurrently and merges them.
///
/// Both reads always settle before anything is decided, and a failure of either one
/// discards the whole merge.
#[instrument(skip_all)]
pub async fn fetch_and_merge(api: &dyn AdminApi) -> Result<Snapshot, ClientError> {
    let (stats, overrides) = tokio::join!(api.dashboard_stats(), api.flag_overrides());
    let (stats, overrides) = (stats?, overrides?);

    let duplicates = duplicate_names(&stats.feature_flags);
    if !duplicates.is_empty() {
        warn!(
            flags = ?duplicates,
            "synchronizer reported duplicate feature flags, keeping the last of each"
        );
    }

    let flags = merge_overrides(&stats.feature_flags, &overrides);
    debug!(
        flags = flags.len(),
        overrides = overrides.len(),
        "merged feature flag overrides"
    );

    Ok(Snapshot {
        flags,
        counters: stats.counters,
    })
}
