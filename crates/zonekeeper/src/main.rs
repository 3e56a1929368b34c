// # zonekeeper - DNS record lifecycle CLI
//
// This binary is a THIN integration layer: quota, uniqueness, ownership and
// local/remote consistency all live in zonekeeper-core.
//
// The binary is responsible for:
// 1. Parsing the command line
// 2. Reading configuration from environment variables
// 3. Registering providers and opening stores
// 4. Running one command and printing its result as JSON
//
// ## Configuration
//
// ### Zone
// - `ZONEKEEPER_BASE_DOMAIN`: Domain records are created under
// - `ZONEKEEPER_PROVIDER_TYPE`: Provider type (cloudflare)
// - `ZONEKEEPER_PROVIDER_API_TOKEN`: API token
// - `ZONEKEEPER_PROVIDER_ZONE_ID`: Zone ID
// - `ZONEKEEPER_REMOTE_TIMEOUT_SECS`: Bound on each provider call (1-30, default 5)
//
// ### Storage
// - `ZONEKEEPER_STATE_STORE_TYPE`: file (default) or memory, for all stores
// - `ZONEKEEPER_STATE_STORE_PATH`: Records JSON file
// - `ZONEKEEPER_ACCOUNTS_PATH`: Accounts JSON file
// - `ZONEKEEPER_SETTINGS_PATH`: Site settings JSON file
//
// ### Logging
// - `ZONEKEEPER_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export ZONEKEEPER_BASE_DOMAIN=example.com
// export ZONEKEEPER_PROVIDER_API_TOKEN=your_token
// export ZONEKEEPER_PROVIDER_ZONE_ID=your_zone_id
//
// zonekeeper account register --email alice@example.com --name Alice
// zonekeeper record create --as <account-id> www a 203.0.113.5
// ```

mod cli;
mod commands;
mod config;

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::FmtSubscriber;
use zonekeeper_core::{Error, ManagerError};

use cli::Cli;
use commands::{ConfigError, Rejected};
use config::Config;

/// Exit codes for command outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZonekeeperExitCode {
    /// Command succeeded
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (remote, storage or unexpected failure)
    RuntimeError = 2,
    /// Request refused for a reason the caller can correct
    Rejected = 3,
}

impl From<ZonekeeperExitCode> for ExitCode {
    fn from(code: ZonekeeperExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl ZonekeeperExitCode {
    /// Classify a failed command
    fn for_error(err: &anyhow::Error) -> Self {
        if err.downcast_ref::<ConfigError>().is_some() {
            return Self::ConfigError;
        }
        if err.downcast_ref::<Rejected>().is_some() {
            return Self::Rejected;
        }
        if let Some(err) = err.downcast_ref::<ManagerError>() {
            return if err.is_user_correctable() {
                Self::Rejected
            } else {
                Self::RuntimeError
            };
        }
        match err.downcast_ref::<Error>() {
            Some(Error::InvalidInput(_) | Error::Conflict(_) | Error::NotFound(_)) => {
                Self::Rejected
            }
            Some(Error::Config(_)) => Self::ConfigError,
            _ => Self::RuntimeError,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ZonekeeperExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ZonekeeperExitCode::ConfigError.into();
    }

    // Logs go to stderr so stdout carries only the JSON result
    let log_level = match config.level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return ZonekeeperExitCode::ConfigError.into();
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ZonekeeperExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonekeeperExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        debug!("Running {:?}", cli.command);
        match commands::run(cli.command, &config).await {
            Ok(output) => match serde_json::to_string_pretty(&output) {
                Ok(json) => {
                    println!("{}", json);
                    ZonekeeperExitCode::Success
                }
                Err(e) => {
                    error!("Failed to render output: {}", e);
                    ZonekeeperExitCode::RuntimeError
                }
            },
            Err(e) => {
                let code = ZonekeeperExitCode::for_error(&e);
                if code == ZonekeeperExitCode::RuntimeError {
                    error!("Command failed: {:#}", e);
                }
                eprintln!("Error: {:#}", e);
                code
            }
        }
    });

    code.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_classification() {
        let quota: anyhow::Error = ManagerError::QuotaExceeded {
            current: 2,
            limit: 2,
        }
        .into();
        assert_eq!(ZonekeeperExitCode::for_error(&quota), ZonekeeperExitCode::Rejected);

        let store: anyhow::Error = ManagerError::Store("disk full".into()).into();
        assert_eq!(ZonekeeperExitCode::for_error(&store), ZonekeeperExitCode::RuntimeError);

        let duplicate: anyhow::Error = Error::conflict("email already registered").into();
        assert_eq!(ZonekeeperExitCode::for_error(&duplicate), ZonekeeperExitCode::Rejected);

        let other = anyhow::anyhow!("boom");
        assert_eq!(ZonekeeperExitCode::for_error(&other), ZonekeeperExitCode::RuntimeError);
    }
}
