use std::fmt::Display;

use crate::api::AdminApi;
use crate::error::ClientError;
use crate::flag::{FeatureFlag, Override};

/// A write against the flag override endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Kill or restore a flag, resending the default treatment an existing override pins.
    SetKilled {
        name: String,
        killed: bool,
        default_treatment: Option<String>,
    },
    /// Send the changed fields of an edit.
    Patch { name: String, patch: Override },
    /// Drop the override so the upstream values show through again.
    Discard { name: String },
}

impl Mutation {
    pub fn set_killed(flag: &FeatureFlag, killed: bool) -> Self {
        Mutation::SetKilled {
            name: flag.name.clone(),
            killed,
            default_treatment: Override::pinned_by(flag).default_treatment,
        }
    }

    pub fn flag_name(&self) -> &str {
        match self {
            Mutation::SetKilled { name, .. }
            | Mutation::Patch { name, .. }
            | Mutation::Discard { name } => name,
        }
    }

    pub async fn apply(&self, api: &dyn AdminApi) -> Result<(), ClientError> {
        match self {
            Mutation::SetKilled {
                name,
                killed,
                default_treatment,
            } => {
                let patch = Override {
                    killed: Some(*killed),
                    default_treatment: default_treatment.clone(),
                };
                api.save_flag_override(name, &patch).await
            }
            Mutation::Patch { name, patch } => api.save_flag_override(name, patch).await,
            Mutation::Discard { name } => api.remove_flag_override(name).await,
        }
    }
}

impl Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mutation::SetKilled { name, killed: true, .. } => write!(f, "kill '{name}'"),
            Mutation::SetKilled {
                name,
                killed: false,
                ..
            } => write!(f, "restore '{name}'"),
            Mutation::Patch { name, .. } => write!(f, "override '{name}'"),
            Mutation::Discard { name } => write!(f, "discard override of '{name}'"),
        }
    }
}
