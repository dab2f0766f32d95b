use anyhow::{Context, Result};
use colored::Colorize;
use flag_overrides::api::AdminApi;
use flag_overrides::edit::OverrideDraft;
use flag_overrides::error::EditError;
use flag_overrides::flag::FeatureFlag;
use flag_overrides::mutation::Mutation;
use flag_overrides::search::filter_flags;
use flag_overrides::sync::{fetch_and_merge, Snapshot};
use tracing::info;

use super::{confirm, ListArgs};
use crate::output;

pub async fn list(api: &dyn AdminApi, args: &ListArgs) -> Result<()> {
    let snapshot = fetch(api).await?;
    let flags = select(&snapshot, args);

    if flags.is_empty() {
        println!("No feature flags found.");
        return Ok(());
    }

    for flag in &flags {
        println!("{}", output::flag_line(flag));
    }
    println!();
    println!("{}", output::summary(&snapshot, flags.len()));

    Ok(())
}

/// The flags `list` prints, in name order.
pub fn select<'a>(snapshot: &'a Snapshot, args: &ListArgs) -> Vec<&'a FeatureFlag> {
    filter_flags(&snapshot.flags, args.search.as_deref().unwrap_or(""))
        .into_iter()
        .filter(|f| !args.overridden || f.is_overridden)
        .collect()
}

pub async fn show(api: &dyn AdminApi, name: &str) -> Result<()> {
    let flag = find_flag(api, name).await?;
    println!("{}", output::flag_details(&flag));
    Ok(())
}

pub async fn set_killed(api: &dyn AdminApi, name: &str, killed: bool, yes: bool) -> Result<()> {
    let flag = find_flag(api, name).await?;

    if flag.killed == killed {
        let state = if killed { "killed" } else { "not killed" };
        println!("'{}' is already {state}.", name.bold());
        return Ok(());
    }

    if killed
        && !yes
        && !confirm(&format!(
            "Kill '{name}'? Every consumer will get '{}'.",
            flag.default_treatment
        ))
    {
        println!("Cancelled.");
        return Ok(());
    }

    apply(api, Mutation::set_killed(&flag, killed)).await
}

pub async fn set_default(api: &dyn AdminApi, name: &str, treatment: &str) -> Result<()> {
    let flag = find_flag(api, name).await?;
    let draft = OverrideDraft {
        default_treatment: treatment.to_string(),
        ..OverrideDraft::from_flag(&flag)
    };

    match draft.diff(&flag)? {
        None => {
            println!("'{}' already defaults to '{treatment}'.", name.bold());
            Ok(())
        }
        Some(patch) => {
            apply(
                api,
                Mutation::Patch {
                    name: name.to_string(),
                    patch,
                },
            )
            .await
        }
    }
}

pub async fn discard(api: &dyn AdminApi, name: &str, yes: bool) -> Result<()> {
    // Overrides of flags the synchronizer no longer reports can still be dropped
    let overrides = api
        .flag_overrides()
        .await
        .context("Failed to fetch feature flag overrides")?;

    if !overrides.contains_key(name) {
        println!("'{}' has no override.", name.bold());
        return Ok(());
    }

    if !yes && !confirm(&format!("Discard the override of '{name}'?")) {
        println!("Cancelled.");
        return Ok(());
    }

    apply(
        api,
        Mutation::Discard {
            name: name.to_string(),
        },
    )
    .await
}

async fn fetch(api: &dyn AdminApi) -> Result<Snapshot> {
    fetch_and_merge(api)
        .await
        .context("Failed to fetch feature flags")
}

async fn find_flag(api: &dyn AdminApi, name: &str) -> Result<FeatureFlag> {
    let snapshot = fetch(api).await?;
    let flag = snapshot
        .flag(name)
        .cloned()
        .ok_or_else(|| EditError::FlagNotFound(name.to_string()))?;
    Ok(flag)
}

/// Sends `mutation`, then prints the flag as the synchronizer now reports it.
async fn apply(api: &dyn AdminApi, mutation: Mutation) -> Result<()> {
    mutation
        .apply(api)
        .await
        .with_context(|| format!("Failed to {mutation}"))?;
    info!("{mutation} done");

    let snapshot = fetch(api).await?;
    match snapshot.flag(mutation.flag_name()) {
        Some(flag) => println!("{}", output::flag_line(flag)),
        None => println!("'{}' is no longer reported.", mutation.flag_name().bold()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use flag_overrides::flag::{Override, Overrides};
    use flag_overrides::test_utils::{flag, ApiCall, MockAdminApi};

    use super::*;

    fn api() -> MockAdminApi {
        MockAdminApi::new()
            .with_flags(vec![
                flag("checkout", &["on", "off"], "on"),
                flag("onboarding", &["control", "v1"], "control"),
            ])
            .with_overrides(Overrides::from([(
                "onboarding".to_string(),
                Override::default_treatment("v1"),
            )]))
    }

    #[tokio::test]
    async fn test_select_applies_search_and_overridden_filter() {
        let snapshot = fetch_and_merge(&api()).await.unwrap();

        let all = select(&snapshot, &ListArgs::default());
        assert_eq!(all.len(), 2);

        let overridden = select(
            &snapshot,
            &ListArgs {
                search: None,
                overridden: true,
            },
        );
        assert_eq!(overridden.len(), 1);
        assert_eq!(overridden[0].name, "onboarding");

        let searched = select(
            &snapshot,
            &ListArgs {
                search: Some("OFF".to_string()),
                overridden: false,
            },
        );
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].name, "checkout");
    }

    #[tokio::test]
    async fn test_kill_with_yes_writes_and_refreshes() {
        let api = api();

        set_killed(&api, "checkout", true, true).await.unwrap();

        assert_eq!(
            api.writes(),
            vec![ApiCall::SaveFlagOverride(
                "checkout".to_string(),
                Override::killed(true)
            )]
        );
        // find, write, refresh
        assert_eq!(
            api.calls()
                .iter()
                .filter(|c| **c == ApiCall::DashboardStats)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_restoring_an_active_flag_writes_nothing() {
        let api = api();

        set_killed(&api, "checkout", false, true).await.unwrap();

        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_flag_is_an_error() {
        let api = api();

        let err = set_killed(&api, "ghost", true, true).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<EditError>(),
            Some(EditError::FlagNotFound(name)) if name == "ghost"
        ));
        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn test_set_default_rejects_unknown_treatment() {
        let api = api();

        let err = set_default(&api, "checkout", "maybe").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<EditError>(),
            Some(EditError::UnknownTreatment { .. })
        ));
        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn test_set_default_sends_only_the_treatment() {
        let api = api();

        set_default(&api, "checkout", "off").await.unwrap();

        assert_eq!(
            api.writes(),
            vec![ApiCall::SaveFlagOverride(
                "checkout".to_string(),
                Override::default_treatment("off")
            )]
        );
    }

    #[tokio::test]
    async fn test_set_default_after_kill_keeps_the_kill() {
        let api = api();

        set_killed(&api, "checkout", true, true).await.unwrap();
        set_default(&api, "checkout", "off").await.unwrap();

        let snapshot = fetch_and_merge(&api).await.unwrap();
        let checkout = snapshot.flag("checkout").unwrap();
        assert!(checkout.killed);
        assert_eq!(checkout.default_treatment, "off");
    }

    #[tokio::test]
    async fn test_kill_keeps_an_overridden_default() {
        let api = api();

        set_killed(&api, "onboarding", true, true).await.unwrap();

        assert_eq!(
            api.writes(),
            vec![ApiCall::SaveFlagOverride(
                "onboarding".to_string(),
                Override {
                    killed: Some(true),
                    default_treatment: Some("v1".to_string()),
                }
            )]
        );
        let snapshot = fetch_and_merge(&api).await.unwrap();
        assert_eq!(snapshot.flag("onboarding").unwrap().default_treatment, "v1");
    }

    #[tokio::test]
    async fn test_set_default_to_current_value_writes_nothing() {
        let api = api();

        // onboarding already serves v1 through its override
        set_default(&api, "onboarding", "v1").await.unwrap();

        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn test_discard_without_override_writes_nothing() {
        let api = api();

        discard(&api, "checkout", true).await.unwrap();

        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn test_discard_with_yes() {
        let api = api();

        discard(&api, "onboarding", true).await.unwrap();

        assert_eq!(
            api.writes(),
            vec![ApiCall::RemoveFlagOverride("onboarding".to_string())]
        );
        assert!(api.overrides().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_carries_context() {
        let api = api().with_write_error(|| flag_overrides::test_utils::api_error(500));

        let err = set_killed(&api, "checkout", true, true).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to kill 'checkout'");
        assert!(err.source().is_some());
    }
}
