use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use flag_overrides::store::{Action, DashboardState, Pane};

const PAGE: isize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Dispatch(Action),
    Quit,
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        Command::Dispatch(action)
    }
}

/// Maps a key press to what it means in the current state of the dashboard.
///
/// Open dialogs take every key first, then the search box, then the edit form.
pub fn command_for(state: &DashboardState, key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
        return Some(Command::Quit);
    }

    if state.dialog.is_some() {
        return dialog_key(key).map(Command::from);
    }
    if state.search_focused {
        return search_key(state, key).map(Command::from);
    }
    if let Pane::Editing { .. } = state.pane {
        if let Some(action) = edit_key(key) {
            return Some(action.into());
        }
    }

    let action = match key.code {
        KeyCode::Char('q') => return Some(Command::Quit),
        KeyCode::Esc if state.pane == Pane::Closed => return Some(Command::Quit),
        KeyCode::Esc => Action::ClosePane,
        KeyCode::Char('/') => Action::FocusSearch,
        KeyCode::Up => Action::MoveCursor(-1),
        KeyCode::Down => Action::MoveCursor(1),
        KeyCode::PageUp => Action::MoveCursor(-PAGE),
        KeyCode::PageDown => Action::MoveCursor(PAGE),
        KeyCode::Enter => Action::OpenDetails,
        KeyCode::Char('e') => Action::BeginEdit,
        KeyCode::Char('k') => Action::RequestKillToggle,
        KeyCode::Char('d') => Action::RequestDiscard,
        KeyCode::Char('r') => Action::Refresh,
        _ => return None,
    };
    Some(action.into())
}

fn dialog_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => Some(Action::ConfirmDialog),
        KeyCode::Char('n') | KeyCode::Esc => Some(Action::DismissDialog),
        _ => None,
    }
}

fn search_key(state: &DashboardState, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => Some(Action::BlurSearch),
        KeyCode::Up => Some(Action::MoveCursor(-1)),
        KeyCode::Down => Some(Action::MoveCursor(1)),
        KeyCode::Backspace => {
            let mut term = state.search.clone();
            term.pop()?;
            Some(Action::SearchChanged(term))
        }
        KeyCode::Char(c) => {
            let mut term = state.search.clone();
            term.push(c);
            Some(Action::SearchChanged(term))
        }
        _ => None,
    }
}

fn edit_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char(' ') => Some(Action::ToggleDraftKilled),
        KeyCode::Left => Some(Action::CycleDraftTreatment(-1)),
        KeyCode::Right => Some(Action::CycleDraftTreatment(1)),
        KeyCode::Enter => Some(Action::SubmitEdit),
        _ => None,
    }
}
