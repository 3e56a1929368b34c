//! Command-line arguments

use clap::{Args, Parser, Subcommand, ValueEnum};
use zonekeeper_core::{Plan, RecordType, Ttl};

/// Manage DNS records under a shared base domain
#[derive(Debug, Parser)]
#[command(name = "zonekeeper", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register and administer accounts
    #[command(subcommand)]
    Account(AccountCommand),

    /// Create, change and remove DNS records
    #[command(subcommand)]
    Record(RecordCommand),

    /// Show record usage against the plan limit
    Quota(Caller),

    /// List available plans
    Plans,

    /// Show or edit site settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

/// Account acting on its own records
#[derive(Debug, Args)]
pub struct Caller {
    /// Account id of the caller
    #[arg(long = "as", env = "ZONEKEEPER_ACCOUNT", value_name = "ACCOUNT_ID")]
    pub account: String,
}

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Register a new account on the free plan
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Grant administrator rights
        #[arg(long)]
        admin: bool,
    },

    /// List all accounts
    List,

    /// Move an account to another plan
    Plan {
        account_id: String,
        #[arg(value_parser = parse_plan)]
        plan: Plan,
    },

    /// Suspend an account; its records stay but cannot be created or changed
    Suspend { account_id: String },

    /// Reactivate a suspended account
    Activate { account_id: String },
}

#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// Create a record under the base domain
    Create {
        #[command(flatten)]
        caller: Caller,
        /// Subdomain label, or "@" for the base domain itself
        label: String,
        #[arg(value_enum, ignore_case = true)]
        record_type: RecordTypeArg,
        /// IP address or CNAME target
        content: String,
        /// TTL in seconds, or "auto"
        #[arg(long, default_value = "auto", value_parser = parse_ttl)]
        ttl: Ttl,
        /// Route traffic through the provider's proxy
        #[arg(long)]
        proxied: bool,
    },

    /// Change content, TTL or proxy flag of a record
    Update {
        #[command(flatten)]
        caller: Caller,
        record_id: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, value_parser = parse_ttl)]
        ttl: Option<Ttl>,
        #[arg(long)]
        proxied: Option<bool>,
    },

    /// Delete a record
    Delete {
        #[command(flatten)]
        caller: Caller,
        record_id: String,
    },

    /// List the caller's records
    List(Caller),

    /// List every record (administrators only)
    ListAll(Caller),
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print the current settings
    Show,

    /// Change settings; an empty value clears a field
    Set {
        /// Version the change is based on (from `settings show`)
        #[arg(long)]
        version: u64,
        #[arg(long)]
        telegram_id: Option<String>,
        #[arg(long)]
        telegram_url: Option<String>,
        #[arg(long)]
        contact_message_en: Option<String>,
        #[arg(long)]
        contact_message_fa: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RecordTypeArg {
    A,
    Aaaa,
    Cname,
}

impl From<RecordTypeArg> for RecordType {
    fn from(arg: RecordTypeArg) -> Self {
        match arg {
            RecordTypeArg::A => RecordType::A,
            RecordTypeArg::Aaaa => RecordType::Aaaa,
            RecordTypeArg::Cname => RecordType::Cname,
        }
    }
}

fn parse_plan(value: &str) -> Result<Plan, String> {
    value.parse().map_err(|e: zonekeeper_core::Error| e.to_string())
}

fn parse_ttl(value: &str) -> Result<Ttl, String> {
    if value.eq_ignore_ascii_case("auto") {
        return Ok(Ttl::Auto);
    }
    value
        .parse::<u32>()
        .map(Ttl::from)
        .map_err(|_| format!("invalid TTL '{}' (expected seconds or \"auto\")", value))
}
