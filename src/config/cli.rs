use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "subscription-sync")]
#[command(about = "Fetch paywall configuration and store prices from a subscription backend")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "subscription-sync.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON (overrides [logging].json)
    #[arg(long)]
    pub json_logs: bool,

    /// Print the canonical response as JSON after syncing
    #[arg(long)]
    pub dump: bool,

    /// Skip fetching store prices (overrides [sync].fetch_commerce)
    #[arg(long)]
    pub no_commerce: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    pub dry_run: bool,
}
