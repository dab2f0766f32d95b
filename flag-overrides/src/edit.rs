use crate::error::EditError;
use crate::flag::{FeatureFlag, Override};

/// Edited values of a flag before they are sent as an override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideDraft {
    pub killed: bool,
    pub default_treatment: String,
}

impl OverrideDraft {
    pub fn from_flag(flag: &FeatureFlag) -> Self {
        Self {
            killed: flag.killed,
            default_treatment: flag.default_treatment.clone(),
        }
    }

    pub fn toggle_killed(&self) -> Self {
        Self {
            killed: !self.killed,
            ..self.clone()
        }
    }

    /// Moves the default treatment `step` positions through the flag's treatments, wrapping.
    pub fn cycle_treatment(&self, flag: &FeatureFlag, step: isize) -> Self {
        if flag.treatments.is_empty() {
            return self.clone();
        }

        let len = flag.treatments.len() as isize;
        let current = flag
            .treatments
            .iter()
            .position(|t| *t == self.default_treatment)
            .map(|i| i as isize)
            .unwrap_or(if step > 0 { -1 } else { 0 });
        let next = (current + step).rem_euclid(len) as usize;

        Self {
            default_treatment: flag.treatments[next].clone(),
            ..self.clone()
        }
    }

    /// The override that turns `original` into this draft.
    ///
    /// Unchanged fields are left out unless an existing override already pins them.
    /// Returns `Ok(None)` when nothing changed.
    pub fn diff(&self, original: &FeatureFlag) -> Result<Option<Override>, EditError> {
        let killed_changed = self.killed != original.killed;
        let treatment_changed = self.default_treatment != original.default_treatment;
        if !killed_changed && !treatment_changed {
            return Ok(None);
        }

        if treatment_changed && !original.has_treatment(&self.default_treatment) {
            return Err(EditError::UnknownTreatment {
                flag: original.name.clone(),
                treatment: self.default_treatment.clone(),
                available: original.treatments.join(", "),
            });
        }

        let mut patch = Override::pinned_by(original);
        if killed_changed {
            patch.killed = Some(self.killed);
        }
        if treatment_changed {
            patch.default_treatment = Some(self.default_treatment.clone());
        }
        Ok(Some(patch))
    }
}
