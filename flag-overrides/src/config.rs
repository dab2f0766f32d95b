use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    /// Base URL of the synchronizer admin API.
    #[envconfig(from = "ADMIN_URL", default = "http://localhost:3010")]
    pub admin_url: String,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "5000")]
    pub request_timeout: EnvMsDuration,

    /// Only for local synchronizers running with self-signed certificates.
    #[envconfig(from = "SKIP_SSL_VERIFICATION", default = "false")]
    pub skip_ssl_verification: bool,

    #[envconfig(from = "DASHBOARD_LOG_FILE", default = "flag-dashboard.log")]
    pub log_file: String,
}

impl Config {
    pub fn with_admin_url(mut self, admin_url: Option<String>) -> Self {
        if let Some(url) = admin_url {
            self.admin_url = url;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_url: "http://localhost:3010".to_string(),
            request_timeout: EnvMsDuration(time::Duration::from_millis(5000)),
            skip_ssl_verification: false,
            log_file: "flag-dashboard.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl std::fmt::Display for ParseEnvMsDurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected a duration in milliseconds")
    }
}

impl std::error::Error for ParseEnvMsDurationError {}

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}
