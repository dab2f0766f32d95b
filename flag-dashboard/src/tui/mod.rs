pub mod keys;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event};
use flag_overrides::api::AdminApi;
use flag_overrides::controller::DashboardController;
use flag_overrides::store::{Action, Store};
use ratatui::DefaultTerminal;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::info;

use keys::Command;

pub struct Dashboard {
    store: Store,
    controller: DashboardController,
    actions: UnboundedReceiver<Action>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn AdminApi>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store: Store::new(),
            controller: DashboardController::new(api, tx, runtime),
            actions: rx,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Reduces `action` and hands any resulting effect to the controller.
    pub fn dispatch(&mut self, action: Action) {
        if let Some(effect) = self.store.dispatch(action) {
            self.controller.run(effect);
        }
    }

    /// Applies every result the controller reported since the last frame.
    pub fn drain_actions(&mut self) {
        while let Ok(action) = self.actions.try_recv() {
            self.dispatch(action);
        }
    }

    fn handle_events(&mut self) -> Result<bool> {
        if !event::poll(Duration::from_millis(17))? {
            return Ok(false);
        }

        if let Event::Key(key) = event::read()? {
            match keys::command_for(&self.store.state(), key) {
                Some(Command::Quit) => return Ok(true),
                Some(Command::Dispatch(action)) => self.dispatch(action),
                None => {}
            }
        }

        Ok(false)
    }

    fn enter_draw_loop(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.dispatch(Action::Refresh);
        loop {
            self.drain_actions();
            let state = self.store.state();
            terminal.draw(|frame| view::draw(frame, &state))?;
            if self.handle_events()? {
                return Ok(());
            }
        }
    }
}

/// Runs the dashboard until the operator quits. Network work is spawned onto `runtime` while
/// the calling thread owns the terminal.
pub fn start_dashboard(api: Arc<dyn AdminApi>, runtime: &Handle) -> Result<()> {
    info!("starting dashboard");
    let terminal = ratatui::init();

    let mut app = Dashboard::new(api, runtime.clone());
    let res = app.enter_draw_loop(terminal);
    ratatui::restore();
    app.controller.shutdown();

    info!("dashboard closed");
    res
}
