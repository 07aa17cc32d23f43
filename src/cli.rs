use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lapsebox")]
#[command(about = "Timelapse capture service with remote replication and chat control", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $LAPSEBOX_CONFIG, then config/lapsebox.toml)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Announce startup, then capture, replicate and notify until stopped
    Run,
    /// Load and validate the configuration, then print it with secrets masked
    CheckConfig,
    /// Send a test message on every ready channel
    TestNotify,
    /// Delete archive days older than the retention horizon
    Sweep,
    /// Replicate one archive day to the remote store
    Upload(UploadArgs),
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Day to replicate (YYYY-MM-DD); today when omitted
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::parse_from(["lapsebox", "run", "--config", "garden.toml", "-v"]);
        assert_eq!(cli.config, Some(PathBuf::from("garden.toml")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Run));
    }

    #[test]
    fn test_parse_upload_date() {
        let cli = Cli::parse_from(["lapsebox", "upload", "--date", "2024-06-01"]);
        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 6, 1));

        assert!(Cli::try_parse_from(["lapsebox", "upload", "--date", "June"]).is_err());
    }
}
