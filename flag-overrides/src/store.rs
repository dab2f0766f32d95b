//! Dashboard state as immutable snapshots.
//!
//! Every key press and every network result becomes an [`Action`]. [`DashboardState::reduce`]
//! turns the current state and an action into the next state, plus at most one [`Effect`] for
//! the controller to run. Nothing mutates a state in place.
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::edit::OverrideDraft;
use crate::flag::FeatureFlag;
use crate::mutation::Mutation;
use crate::search::filter_flags;
use crate::sync::Snapshot;

#[derive(Debug, Clone, PartialEq)]
pub enum Pane {
    Closed,
    Details { name: String },
    Editing { name: String, draft: OverrideDraft },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    ConfirmKill { name: String, killed: bool },
    ConfirmDiscard { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RefreshStarted { generation: u64 },
    SnapshotLoaded { generation: u64, snapshot: Snapshot },
    RefreshFailed { generation: u64 },
    MutationStarted { name: String },
    MutationFinished { name: String },

    Refresh,
    FocusSearch,
    BlurSearch,
    SearchChanged(String),
    MoveCursor(isize),
    OpenDetails,
    ClosePane,
    BeginEdit,
    ToggleDraftKilled,
    CycleDraftTreatment(isize),
    SubmitEdit,
    RequestKillToggle,
    RequestDiscard,
    ConfirmDialog,
    DismissDialog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Refresh,
    Submit(Mutation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub snapshot: Arc<Snapshot>,
    /// Generation of the refresh that produced `snapshot`, 0 before the first load.
    pub generation: u64,
    /// Generation of the most recently started refresh.
    pub requested_generation: u64,
    pub refreshing: bool,
    pub search: String,
    pub search_focused: bool,
    /// Index into the visible (filtered) flags.
    pub cursor: usize,
    pub pane: Pane,
    pub dialog: Option<Dialog>,
    /// Flags with a write in flight.
    pub pending: BTreeSet<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(Snapshot::default()),
            generation: 0,
            requested_generation: 0,
            refreshing: false,
            search: String::new(),
            search_focused: false,
            cursor: 0,
            pane: Pane::Closed,
            dialog: None,
            pending: BTreeSet::new(),
        }
    }
}

impl DashboardState {
    pub fn loaded(&self) -> bool {
        self.generation > 0
    }

    pub fn visible(&self) -> Vec<&FeatureFlag> {
        filter_flags(&self.snapshot.flags, &self.search)
    }

    pub fn flag_under_cursor(&self) -> Option<&FeatureFlag> {
        self.visible().get(self.cursor).copied()
    }

    pub fn pane_flag(&self) -> Option<&FeatureFlag> {
        match &self.pane {
            Pane::Closed => None,
            Pane::Details { name } | Pane::Editing { name, .. } => self.snapshot.flag(name),
        }
    }

    /// The flag keyboard commands act on: the one in the side pane, else the one under the cursor.
    pub fn focused_flag(&self) -> Option<&FeatureFlag> {
        match self.pane {
            Pane::Closed => self.flag_under_cursor(),
            _ => self.pane_flag(),
        }
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.contains(name)
    }

    pub fn reduce(&self, action: Action) -> (DashboardState, Option<Effect>) {
        let mut next = self.clone();
        let effect = next.apply(action);
        (next, effect)
    }

    fn apply(&mut self, action: Action) -> Option<Effect> {
        match action {
            Action::RefreshStarted { generation } => {
                self.requested_generation = self.requested_generation.max(generation);
                self.refreshing = true;
                None
            }
            Action::SnapshotLoaded {
                generation,
                snapshot,
            } => {
                if generation < self.generation {
                    return None;
                }
                self.generation = generation;
                self.snapshot = Arc::new(snapshot);
                self.refreshing = generation < self.requested_generation;
                if self.pane != Pane::Closed && self.pane_flag().is_none() {
                    self.pane = Pane::Closed;
                }
                self.clamp_cursor();
                None
            }
            Action::RefreshFailed { generation } => {
                if generation >= self.requested_generation {
                    self.refreshing = false;
                }
                None
            }
            Action::MutationStarted { name } => {
                self.pending.insert(name);
                None
            }
            Action::MutationFinished { name } => {
                self.pending.remove(&name);
                None
            }
            Action::Refresh => Some(Effect::Refresh),
            Action::FocusSearch => {
                self.search_focused = true;
                None
            }
            Action::BlurSearch => {
                self.search_focused = false;
                None
            }
            Action::SearchChanged(term) => {
                self.search = term;
                self.cursor = 0;
                None
            }
            Action::MoveCursor(delta) => {
                let target = self.cursor as isize + delta;
                self.cursor = target.max(0) as usize;
                self.clamp_cursor();
                None
            }
            Action::OpenDetails => {
                if let Some(flag) = self.flag_under_cursor() {
                    self.pane = Pane::Details {
                        name: flag.name.clone(),
                    };
                }
                None
            }
            Action::ClosePane => {
                self.pane = Pane::Closed;
                None
            }
            Action::BeginEdit => {
                if let Some(flag) = self.focused_flag() {
                    self.pane = Pane::Editing {
                        name: flag.name.clone(),
                        draft: OverrideDraft::from_flag(flag),
                    };
                }
                None
            }
            Action::ToggleDraftKilled => {
                if let Pane::Editing { draft, .. } = &mut self.pane {
                    *draft = draft.toggle_killed();
                }
                None
            }
            Action::CycleDraftTreatment(step) => {
                if let Some(flag) = self.pane_flag().cloned() {
                    if let Pane::Editing { draft, .. } = &mut self.pane {
                        *draft = draft.cycle_treatment(&flag, step);
                    }
                }
                None
            }
            Action::SubmitEdit => self.submit_edit(),
            Action::RequestKillToggle => {
                if let Some(flag) = self.focused_flag() {
                    self.dialog = Some(Dialog::ConfirmKill {
                        name: flag.name.clone(),
                        killed: !flag.killed,
                    });
                }
                None
            }
            Action::RequestDiscard => {
                if let Some(flag) = self.focused_flag().filter(|f| f.is_overridden) {
                    self.dialog = Some(Dialog::ConfirmDiscard {
                        name: flag.name.clone(),
                    });
                }
                None
            }
            Action::ConfirmDialog => match self.dialog.take()? {
                Dialog::ConfirmKill { name, killed } => {
                    let mutation = match self.snapshot.flag(&name) {
                        Some(flag) => Mutation::set_killed(flag, killed),
                        None => Mutation::SetKilled {
                            name,
                            killed,
                            default_treatment: None,
                        },
                    };
                    Some(Effect::Submit(mutation))
                }
                Dialog::ConfirmDiscard { name } => {
                    Some(Effect::Submit(Mutation::Discard { name }))
                }
            },
            Action::DismissDialog => {
                self.dialog = None;
                None
            }
        }
    }

    fn submit_edit(&mut self) -> Option<Effect> {
        let Pane::Editing { name, draft } = &self.pane else {
            return None;
        };
        let name = name.clone();
        let Some(original) = self.snapshot.flag(&name) else {
            self.pane = Pane::Closed;
            return None;
        };

        // Drafts only ever pick listed treatments, so a rejected diff keeps the form open
        let patch = draft.diff(original).ok()?;
        self.pane = Pane::Details { name: name.clone() };
        patch.map(|patch| Effect::Submit(Mutation::Patch { name, patch }))
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

/// Holds the current state and swaps in the next one on every dispatch.
#[derive(Default)]
pub struct Store {
    state: Arc<DashboardState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<DashboardState> {
        Arc::clone(&self.state)
    }

    pub fn dispatch(&mut self, action: Action) -> Option<Effect> {
        let (next, effect) = self.state.reduce(action);
        self.state = Arc::new(next);
        effect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::{Counters, Override};
    use crate::test_utils::flag;

    fn snapshot() -> Snapshot {
        let mut killed = flag("b_killed", &["on", "off"], "off");
        killed.killed = true;
        killed.is_overridden = true;
        Snapshot {
            flags: vec![
                flag("a_checkout", &["on", "off"], "off"),
                killed,
                flag("c_onboarding", &["control", "v1", "v2"], "control"),
            ],
            counters: Counters::default(),
        }
    }

    fn loaded() -> Store {
        let mut store = Store::new();
        store.dispatch(Action::RefreshStarted { generation: 1 });
        store.dispatch(Action::SnapshotLoaded {
            generation: 1,
            snapshot: snapshot(),
        });
        store
    }

    #[test]
    fn test_initial_state() {
        let store = Store::new();
        let state = store.state();

        assert!(!state.loaded());
        assert!(state.visible().is_empty());
        assert!(state.flag_under_cursor().is_none());
    }

    #[test]
    fn test_reduce_leaves_previous_state_untouched() {
        let store = loaded();
        let before = store.state();

        let (after, _) = before.reduce(Action::SearchChanged("b_".to_string()));

        assert_eq!(before.search, "");
        assert_eq!(after.search, "b_");
    }

    #[test]
    fn test_snapshot_loaded_replaces_flags() {
        let store = loaded();
        let state = store.state();

        assert!(state.loaded());
        assert!(!state.refreshing);
        assert_eq!(state.visible().len(), 3);
        assert_eq!(state.generation, 1);
    }

    #[test]
    fn test_stale_snapshot_is_dropped() {
        let mut store = loaded();
        store.dispatch(Action::RefreshStarted { generation: 5 });
        store.dispatch(Action::SnapshotLoaded {
            generation: 5,
            snapshot: Snapshot {
                flags: vec![flag("newest", &["on"], "on")],
                counters: Counters::default(),
            },
        });

        store.dispatch(Action::SnapshotLoaded {
            generation: 3,
            snapshot: snapshot(),
        });

        let state = store.state();
        assert_eq!(state.generation, 5);
        assert_eq!(state.snapshot.flags[0].name, "newest");
    }

    #[test]
    fn test_refreshing_tracks_latest_request() {
        let mut store = loaded();
        store.dispatch(Action::RefreshStarted { generation: 2 });
        store.dispatch(Action::RefreshStarted { generation: 3 });
        assert!(store.state().refreshing);

        store.dispatch(Action::SnapshotLoaded {
            generation: 2,
            snapshot: snapshot(),
        });
        assert!(store.state().refreshing);

        store.dispatch(Action::RefreshFailed { generation: 3 });
        assert!(!store.state().refreshing);
        // The failed refresh left the last good snapshot in place
        assert_eq!(store.state().generation, 2);
        assert_eq!(store.state().visible().len(), 3);
    }

    #[test]
    fn test_search_filters_and_resets_cursor() {
        let mut store = loaded();
        store.dispatch(Action::MoveCursor(2));
        store.dispatch(Action::SearchChanged("V2".to_string()));

        let state = store.state();
        assert_eq!(state.cursor, 0);
        let names: Vec<&str> = state.visible().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["c_onboarding"]);
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut store = loaded();
        store.dispatch(Action::MoveCursor(10));
        assert_eq!(store.state().cursor, 2);
        store.dispatch(Action::MoveCursor(-10));
        assert_eq!(store.state().cursor, 0);

        store.dispatch(Action::SearchChanged("nothing".to_string()));
        store.dispatch(Action::MoveCursor(1));
        assert_eq!(store.state().cursor, 0);
        assert!(store.state().flag_under_cursor().is_none());
    }

    #[test]
    fn test_cursor_clamped_when_snapshot_shrinks() {
        let mut store = loaded();
        store.dispatch(Action::MoveCursor(2));
        store.dispatch(Action::SnapshotLoaded {
            generation: 2,
            snapshot: Snapshot {
                flags: vec![flag("only", &["on"], "on")],
                counters: Counters::default(),
            },
        });

        assert_eq!(store.state().cursor, 0);
    }

    #[test]
    fn test_details_pane_follows_cursor_flag() {
        let mut store = loaded();
        store.dispatch(Action::MoveCursor(1));
        store.dispatch(Action::OpenDetails);

        let state = store.state();
        assert_eq!(
            state.pane,
            Pane::Details {
                name: "b_killed".to_string()
            }
        );
        assert_eq!(state.focused_flag().unwrap().name, "b_killed");

        store.dispatch(Action::ClosePane);
        assert_eq!(store.state().pane, Pane::Closed);
    }

    #[test]
    fn test_pane_closes_when_flag_disappears() {
        let mut store = loaded();
        store.dispatch(Action::OpenDetails);
        store.dispatch(Action::SnapshotLoaded {
            generation: 2,
            snapshot: Snapshot {
                flags: vec![flag("other", &["on"], "on")],
                counters: Counters::default(),
            },
        });

        assert_eq!(store.state().pane, Pane::Closed);
    }

    #[test]
    fn test_kill_requires_confirmation() {
        let mut store = loaded();

        assert_eq!(store.dispatch(Action::RequestKillToggle), None);
        assert_eq!(
            store.state().dialog,
            Some(Dialog::ConfirmKill {
                name: "a_checkout".to_string(),
                killed: true,
            })
        );

        let effect = store.dispatch(Action::ConfirmDialog);
        assert_eq!(
            effect,
            Some(Effect::Submit(Mutation::SetKilled {
                name: "a_checkout".to_string(),
                killed: true,
                default_treatment: None,
            }))
        );
        assert_eq!(store.state().dialog, None);
    }

    #[test]
    fn test_restore_a_killed_flag() {
        let mut store = loaded();
        store.dispatch(Action::MoveCursor(1));
        store.dispatch(Action::RequestKillToggle);

        // b_killed is overridden, so its default treatment goes along
        assert_eq!(
            store.dispatch(Action::ConfirmDialog),
            Some(Effect::Submit(Mutation::SetKilled {
                name: "b_killed".to_string(),
                killed: false,
                default_treatment: Some("off".to_string()),
            }))
        );
    }

    #[test]
    fn test_dismissed_dialog_has_no_effect() {
        let mut store = loaded();
        store.dispatch(Action::RequestKillToggle);
        store.dispatch(Action::DismissDialog);

        assert_eq!(store.state().dialog, None);
        assert_eq!(store.dispatch(Action::ConfirmDialog), None);
    }

    #[test]
    fn test_discard_only_offered_for_overridden_flags() {
        let mut store = loaded();
        store.dispatch(Action::RequestDiscard);
        assert_eq!(store.state().dialog, None);

        store.dispatch(Action::MoveCursor(1));
        store.dispatch(Action::RequestDiscard);
        assert_eq!(
            store.dispatch(Action::ConfirmDialog),
            Some(Effect::Submit(Mutation::Discard {
                name: "b_killed".to_string()
            }))
        );
    }

    #[test]
    fn test_edit_form_sends_only_changes() {
        let mut store = loaded();
        store.dispatch(Action::MoveCursor(2));
        store.dispatch(Action::BeginEdit);
        store.dispatch(Action::CycleDraftTreatment(1));
        store.dispatch(Action::CycleDraftTreatment(1));

        match &store.state().pane {
            Pane::Editing { draft, .. } => assert_eq!(draft.default_treatment, "v2"),
            other => panic!("expected edit form, got {other:?}"),
        }

        let effect = store.dispatch(Action::SubmitEdit);
        assert_eq!(
            effect,
            Some(Effect::Submit(Mutation::Patch {
                name: "c_onboarding".to_string(),
                patch: Override::default_treatment("v2"),
            }))
        );
        assert_eq!(
            store.state().pane,
            Pane::Details {
                name: "c_onboarding".to_string()
            }
        );
    }

    #[test]
    fn test_unchanged_edit_submits_nothing() {
        let mut store = loaded();
        store.dispatch(Action::BeginEdit);
        store.dispatch(Action::ToggleDraftKilled);
        store.dispatch(Action::ToggleDraftKilled);

        assert_eq!(store.dispatch(Action::SubmitEdit), None);
        assert_eq!(
            store.state().pane,
            Pane::Details {
                name: "a_checkout".to_string()
            }
        );
    }

    #[test]
    fn test_draft_actions_ignored_outside_edit_form() {
        let mut store = loaded();
        let before = store.state();

        store.dispatch(Action::ToggleDraftKilled);
        store.dispatch(Action::CycleDraftTreatment(1));
        assert_eq!(store.dispatch(Action::SubmitEdit), None);

        assert_eq!(*store.state(), *before);
    }

    #[test]
    fn test_pending_mutations() {
        let mut store = loaded();
        store.dispatch(Action::MutationStarted {
            name: "a_checkout".to_string(),
        });
        assert!(store.state().is_pending("a_checkout"));

        store.dispatch(Action::MutationFinished {
            name: "a_checkout".to_string(),
        });
        assert!(!store.state().is_pending("a_checkout"));
    }

    #[test]
    fn test_refresh_is_an_effect() {
        let mut store = loaded();
        assert_eq!(store.dispatch(Action::Refresh), Some(Effect::Refresh));
    }
}
