use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::api::AdminApi;
use crate::error::ClientError;
use crate::flag::{
    DashboardStats, FeatureFlag, Override, Overrides, SegmentOperation, SegmentOverrides,
};

pub fn flag(name: &str, treatments: &[&str], default_treatment: &str) -> FeatureFlag {
    FeatureFlag {
        name: name.to_string(),
        active: true,
        killed: false,
        default_treatment: default_treatment.to_string(),
        treatments: treatments.iter().map(|t| t.to_string()).collect(),
        flag_sets: vec![],
        cn: "Mon Jan 02 15:04:05 UTC 2006".to_string(),
        change_number: 1136214245000,
        is_overridden: false,
    }
}

pub fn api_error(status: u16) -> ClientError {
    let url = Url::parse("http://localhost:3010/admin").expect("static url is valid");
    ClientError::ApiError(status, Box::new(url), String::new())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    DashboardStats,
    FlagOverrides,
    SaveFlagOverride(String, Override),
    RemoveFlagOverride(String),
    SegmentOverrides,
    SaveSegmentOverride(String, String, SegmentOperation),
    RemoveSegmentOverride(String, String),
}

type ErrorFactory = Arc<dyn Fn() -> ClientError + Send + Sync>;

/// An in-memory admin API that keeps overrides the way the synchronizer does.
///
/// A saved override is the upstream flag with the patch applied, holding both fields.
/// Writes against flags missing from the stats answer 404, and every call is recorded.
#[derive(Clone)]
pub struct MockAdminApi {
    stats: Arc<Mutex<DashboardStats>>,
    overrides: Arc<Mutex<Overrides>>,
    segments: Arc<Mutex<SegmentOverrides>>,
    calls: Arc<Mutex<Vec<ApiCall>>>,
    latency: Duration,
    write_latency: Duration,
    stats_error: Option<ErrorFactory>,
    overrides_error: Option<ErrorFactory>,
    write_error: Option<ErrorFactory>,
}

impl MockAdminApi {
    pub fn new() -> MockAdminApi {
        MockAdminApi {
            stats: Default::default(),
            overrides: Default::default(),
            segments: Default::default(),
            calls: Default::default(),
            latency: Duration::ZERO,
            write_latency: Duration::ZERO,
            stats_error: None,
            overrides_error: None,
            write_error: None,
        }
    }

    pub fn with_stats(self, stats: DashboardStats) -> Self {
        *self.stats.lock().unwrap() = stats;
        self
    }

    pub fn with_flags(self, flags: Vec<FeatureFlag>) -> Self {
        self.stats.lock().unwrap().feature_flags = flags;
        self
    }

    pub fn with_overrides(self, overrides: Overrides) -> Self {
        *self.overrides.lock().unwrap() = overrides;
        self
    }

    /// Delay applied to every read.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Delay applied to every write.
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = latency;
        self
    }

    pub fn with_stats_error(mut self, f: impl Fn() -> ClientError + Send + Sync + 'static) -> Self {
        self.stats_error = Some(Arc::new(f));
        self
    }

    pub fn with_overrides_error(
        mut self,
        f: impl Fn() -> ClientError + Send + Sync + 'static,
    ) -> Self {
        self.overrides_error = Some(Arc::new(f));
        self
    }

    pub fn with_write_error(mut self, f: impl Fn() -> ClientError + Send + Sync + 'static) -> Self {
        self.write_error = Some(Arc::new(f));
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    ApiCall::SaveFlagOverride(..) | ApiCall::RemoveFlagOverride(_)
                )
            })
            .collect()
    }

    pub fn overrides(&self) -> Overrides {
        self.overrides.lock().unwrap().clone()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn upstream_flag(&self, name: &str) -> Option<FeatureFlag> {
        self.stats
            .lock()
            .unwrap()
            .feature_flags
            .iter()
            .rfind(|f| f.name == name)
            .cloned()
    }

    async fn read_delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    async fn write_delay(&self) {
        if !self.write_latency.is_zero() {
            tokio::time::sleep(self.write_latency).await;
        }
    }

    fn write_outcome(&self) -> Result<(), ClientError> {
        match &self.write_error {
            Some(f) => Err(f()),
            None => Ok(()),
        }
    }
}

impl Default for MockAdminApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminApi for MockAdminApi {
    async fn dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        self.record(ApiCall::DashboardStats);
        self.read_delay().await;
        if let Some(f) = &self.stats_error {
            return Err(f());
        }
        Ok(self.stats.lock().unwrap().clone())
    }

    async fn flag_overrides(&self) -> Result<Overrides, ClientError> {
        self.record(ApiCall::FlagOverrides);
        self.read_delay().await;
        if let Some(f) = &self.overrides_error {
            return Err(f());
        }
        Ok(self.overrides.lock().unwrap().clone())
    }

    async fn save_flag_override(&self, name: &str, patch: &Override) -> Result<(), ClientError> {
        self.record(ApiCall::SaveFlagOverride(name.to_string(), patch.clone()));
        self.write_delay().await;
        self.write_outcome()?;
        let Some(upstream) = self.upstream_flag(name) else {
            return Err(api_error(404));
        };

        // Rebuilt from the upstream flag, so fields missing from the patch are reset
        let stored = Override {
            killed: Some(patch.killed.unwrap_or(upstream.killed)),
            default_treatment: Some(
                patch
                    .default_treatment
                    .clone()
                    .unwrap_or(upstream.default_treatment),
            ),
        };
        self.overrides
            .lock()
            .unwrap()
            .insert(name.to_string(), stored);
        Ok(())
    }

    async fn remove_flag_override(&self, name: &str) -> Result<(), ClientError> {
        self.record(ApiCall::RemoveFlagOverride(name.to_string()));
        self.write_delay().await;
        self.write_outcome()?;
        self.overrides.lock().unwrap().remove(name);
        Ok(())
    }

    async fn segment_overrides(&self) -> Result<SegmentOverrides, ClientError> {
        self.record(ApiCall::SegmentOverrides);
        self.read_delay().await;
        Ok(self.segments.lock().unwrap().clone())
    }

    async fn save_segment_override(
        &self,
        segment: &str,
        key: &str,
        operation: SegmentOperation,
    ) -> Result<(), ClientError> {
        self.record(ApiCall::SaveSegmentOverride(
            segment.to_string(),
            key.to_string(),
            operation,
        ));
        self.write_outcome()?;
        let mut segments = self.segments.lock().unwrap();
        let keys = segments
            .entry(segment.to_string())
            .or_insert_with(|| serde_json::json!({}));
        if let Some(keys) = keys.as_object_mut() {
            keys.insert(key.to_string(), serde_json::json!(operation));
        }
        Ok(())
    }

    async fn remove_segment_override(&self, segment: &str, key: &str) -> Result<(), ClientError> {
        self.record(ApiCall::RemoveSegmentOverride(
            segment.to_string(),
            key.to_string(),
        ));
        self.write_outcome()?;
        let mut segments = self.segments.lock().unwrap();
        if let Some(keys) = segments.get_mut(segment).and_then(|k| k.as_object_mut()) {
            keys.remove(key);
        }
        Ok(())
    }
}
