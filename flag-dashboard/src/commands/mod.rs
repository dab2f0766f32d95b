pub mod flags;
pub mod segments;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use envconfig::Envconfig;
use flag_overrides::api::AdminClient;
use flag_overrides::config::Config;
use tokio::runtime::Runtime;

use crate::{logging, tui};
use segments::SegmentsCommand;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the synchronizer admin API
    #[arg(long, env = "ADMIN_URL")]
    admin_url: Option<String>,

    /// Whether to skip SSL verification - only use against local synchronizers with self-signed certificates
    #[arg(long, default_value = "false")]
    skip_ssl_verification: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive dashboard. This is the default when no command is given
    Dashboard,

    /// Print the feature flags with their overrides applied
    List(ListArgs),

    /// Print every field of one feature flag
    Show { name: String },

    /// Kill a feature flag, so every consumer gets its default treatment
    Kill {
        name: String,

        /// Don't ask for confirmation
        #[arg(short, long, default_value = "false")]
        yes: bool,
    },

    /// Bring a killed feature flag back
    Restore { name: String },

    /// Override the default treatment of a feature flag
    SetDefault { name: String, treatment: String },

    /// Drop the override of a feature flag, so the upstream values show through again
    Discard {
        name: String,

        /// Don't ask for confirmation
        #[arg(short, long, default_value = "false")]
        yes: bool,
    },

    /// Inspect and edit segment membership overrides
    Segments {
        #[command(subcommand)]
        cmd: SegmentsCommand,
    },
}

#[derive(clap::Args, Default)]
pub struct ListArgs {
    /// Only show flags whose name or treatments contain this term, ignoring case
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only show flags that carry an override
    #[arg(long, default_value = "false")]
    pub overridden: bool,
}

impl Cli {
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        let config = cli.config()?;

        let command = cli.command.unwrap_or(Commands::Dashboard);
        match &command {
            Commands::Dashboard => logging::init_file(Path::new(&config.log_file))?,
            _ => logging::init_stderr()?,
        }

        let client = AdminClient::from_config(&config).context("Failed to create admin client")?;
        let runtime = Runtime::new().context("Failed to start async runtime")?;

        match command {
            Commands::Dashboard => tui::start_dashboard(Arc::new(client), runtime.handle())?,
            Commands::List(args) => runtime.block_on(flags::list(&client, &args))?,
            Commands::Show { name } => runtime.block_on(flags::show(&client, &name))?,
            Commands::Kill { name, yes } => {
                runtime.block_on(flags::set_killed(&client, &name, true, yes))?
            }
            Commands::Restore { name } => {
                runtime.block_on(flags::set_killed(&client, &name, false, true))?
            }
            Commands::SetDefault { name, treatment } => {
                runtime.block_on(flags::set_default(&client, &name, &treatment))?
            }
            Commands::Discard { name, yes } => {
                runtime.block_on(flags::discard(&client, &name, yes))?
            }
            Commands::Segments { cmd } => runtime.block_on(segments::run(&client, &cmd))?,
        }

        Ok(())
    }

    fn config(&self) -> Result<Config> {
        let mut config = Config::init_from_env()
            .context("Failed to load configuration")?
            .with_admin_url(self.admin_url.clone());
        if self.skip_ssl_verification {
            config.skip_ssl_verification = true;
        }
        Ok(config)
    }
}

/// Asks the operator to confirm a change. Anything but an explicit yes cancels.
pub(crate) fn confirm(message: &str) -> bool {
    inquire::Confirm::new(message)
        .with_default(false)
        .prompt()
        .unwrap_or(false)
}
