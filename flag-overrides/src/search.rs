use crate::flag::FeatureFlag;

pub fn matches(flag: &FeatureFlag, term: &str) -> bool {
    let needle = term.to_lowercase();
    flag.name.to_lowercase().contains(&needle)
        || flag
            .treatments
            .iter()
            .any(|t| t.to_lowercase().contains(&needle))
}

/// Flags whose name or any treatment contains `term`, ignoring case.
///
/// An empty term keeps every flag. Order is preserved.
pub fn filter_flags<'a>(flags: &'a [FeatureFlag], term: &str) -> Vec<&'a FeatureFlag> {
    if term.is_empty() {
        return flags.iter().collect();
    }

    flags.iter().filter(|flag| matches(flag, term)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::flag;

    fn names(flags: Vec<&FeatureFlag>) -> Vec<&str> {
        flags.into_iter().map(|f| f.name.as_str()).collect()
    }

    fn sample() -> Vec<FeatureFlag> {
        vec![
            flag("checkout_v2", &["on", "off"], "off"),
            flag("new_onboarding", &["control", "treatment_a"], "control"),
            flag("search_ranking", &["legacy", "ML_model"], "legacy"),
        ]
    }

    #[test]
    fn test_empty_term_returns_everything() {
        let flags = sample();
        assert_eq!(filter_flags(&flags, "").len(), 3);
    }

    #[test]
    fn test_matches_name_ignoring_case() {
        let flags = sample();
        assert_eq!(names(filter_flags(&flags, "CHECKOUT")), vec!["checkout_v2"]);
        assert_eq!(names(filter_flags(&flags, "Ranking")), vec!["search_ranking"]);
    }

    #[test]
    fn test_matches_any_treatment() {
        let flags = sample();
        assert_eq!(names(filter_flags(&flags, "ml_")), vec!["search_ranking"]);
        assert_eq!(
            names(filter_flags(&flags, "treatment_")),
            vec!["new_onboarding"]
        );
        // "on" appears in a name and in a treatment
        assert_eq!(
            names(filter_flags(&flags, "on")),
            vec!["checkout_v2", "new_onboarding"]
        );
    }

    #[test]
    fn test_no_match_is_empty() {
        let flags = sample();
        assert!(filter_flags(&flags, "nothing-here").is_empty());
    }

    #[test]
    fn test_every_result_contains_term() {
        let flags = sample();
        for term in ["o", "ON", "a", "_", "zz"] {
            let found = filter_flags(&flags, term);
            assert!(found.iter().all(|f| matches(f, term)));
            assert_eq!(
                found.len(),
                flags.iter().filter(|f| matches(f, term)).count()
            );
        }
    }
}
