use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A feature flag as reported by the synchronizer, or after overrides are merged on top.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub killed: bool,
    #[serde(default)]
    pub default_treatment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub treatments: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flag_sets: Vec<String>,
    /// Last modification date, as formatted by the synchronizer.
    #[serde(default)]
    pub cn: String,
    #[serde(default)]
    pub change_number: i64,
    /// Never trusted from the wire; recomputed on every merge.
    #[serde(default)]
    pub is_overridden: bool,
}

impl FeatureFlag {
    pub fn has_treatment(&self, treatment: &str) -> bool {
        self.treatments.iter().any(|t| t == treatment)
    }
}

/// The fields an operator changed on a flag. Absent fields keep the upstream value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_treatment: Option<String>,
}

impl Override {
    pub fn killed(killed: bool) -> Self {
        Self {
            killed: Some(killed),
            default_treatment: None,
        }
    }

    pub fn default_treatment(treatment: impl Into<String>) -> Self {
        Self {
            killed: None,
            default_treatment: Some(treatment.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.killed.is_none() && self.default_treatment.is_none()
    }

    /// The fields an existing override holds on a merged `flag`, empty if there is none.
    ///
    /// The synchronizer rebuilds an override from the upstream flag on every write, so a
    /// write that leaves these out resets them.
    pub fn pinned_by(flag: &FeatureFlag) -> Self {
        if !flag.is_overridden {
            return Self::default();
        }
        Self {
            killed: Some(flag.killed),
            default_treatment: Some(flag.default_treatment.clone()),
        }
    }

    /// Returns `flag` with every present field of this override substituted.
    pub fn apply_to(&self, flag: &FeatureFlag) -> FeatureFlag {
        let mut merged = flag.clone();
        if let Some(killed) = self.killed {
            merged.killed = killed;
        }
        if let Some(treatment) = &self.default_treatment {
            merged.default_treatment = treatment.clone();
        }
        merged
    }
}

/// Overrides keyed by flag name, as served by `GET /admin/overrides/ff`.
pub type Overrides = BTreeMap<String, Override>;

/// Segment overrides keyed by segment name. The per-key payload is kept opaque.
pub type SegmentOverrides = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentOperation {
    Add,
    Remove,
}

#[derive(Debug, Serialize)]
pub struct SegmentOverridePayload {
    pub operation: SegmentOperation,
}

/// Payload of `GET /admin/dashboard/stats`. Only the flags take part in the merge.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    // Older synchronizers report the same list under "splits"
    #[serde(default, alias = "splits", deserialize_with = "null_as_default")]
    pub feature_flags: Vec<FeatureFlag>,
    #[serde(flatten)]
    pub counters: Counters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    #[serde(default)]
    pub backend_total_requests: i64,
    #[serde(default)]
    pub requests_ok: i64,
    #[serde(default)]
    pub requests_errored: i64,
    #[serde(default)]
    pub backend_requests_ok: i64,
    #[serde(default)]
    pub backend_requests_errored: i64,
    #[serde(default)]
    pub sdks_total_requests: i64,
    #[serde(default)]
    pub logged_errors: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logged_messages: Vec<String>,
    /// Seconds since the synchronizer started.
    #[serde(default)]
    pub uptime: i64,
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserializes an overrides body, where the synchronizer may answer `null`.
pub fn parse_overrides(body: &str) -> Result<Overrides, serde_json::Error> {
    Ok(serde_json::from_str::<Option<Overrides>>(body)?.unwrap_or_default())
}
