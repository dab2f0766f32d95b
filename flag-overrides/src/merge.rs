use std::collections::BTreeMap;

use crate::flag::{FeatureFlag, Overrides};

/// Layers `overrides` on top of the upstream flags.
///
/// The result is sorted by name and `is_overridden` is set for every flag with an override
/// record, whether or not the override changes anything. Overrides for names missing from
/// `base` are ignored. When `base` repeats a name, the last occurrence wins.
pub fn merge_overrides(base: &[FeatureFlag], overrides: &Overrides) -> Vec<FeatureFlag> {
    let mut by_name: BTreeMap<&str, &FeatureFlag> = BTreeMap::new();
    for flag in base {
        by_name.insert(flag.name.as_str(), flag);
    }

    by_name
        .into_iter()
        .map(|(name, flag)| match overrides.get(name) {
            Some(patch) => FeatureFlag {
                is_overridden: true,
                ..patch.apply_to(flag)
            },
            None => FeatureFlag {
                is_overridden: false,
                ..flag.clone()
            },
        })
        .collect()
}

/// Names that appear more than once in `base`, sorted and reported once each.
pub fn duplicate_names(base: &[FeatureFlag]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for flag in base {
        *counts.entry(flag.name.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}
