// src/cli.rs
use clap::Parser;

use crate::config::Config;

/// ct-tail: follow Certificate Transparency logs
///
/// Prints one line for every new certificate logged after startup.
#[derive(Parser, Debug, Clone)]
#[command(name = "ct-tail")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to TOML config file (defaults apply when omitted)
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Output records in JSONL format
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Output records in CSV format
    #[arg(long = "csv")]
    pub csv: bool,

    /// Write records to file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Override poll interval in seconds
    #[arg(long = "poll-interval")]
    pub poll_interval: Option<u64>,

    /// Monitor logs of this operator (repeatable, overrides config)
    #[arg(long = "operator")]
    pub operators: Vec<String>,

    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.json && self.csv {
            anyhow::bail!("Cannot specify multiple output formats. Choose one of: --json or --csv");
        }

        if self.poll_interval == Some(0) {
            anyhow::bail!("--poll-interval must be greater than 0");
        }

        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        Ok(())
    }

    /// Apply command line overrides on top of the file config
    pub fn apply_to(&self, config: &mut Config) {
        if self.json {
            config.output.format = "json".to_string();
        } else if self.csv {
            config.output.format = "csv".to_string();
        }

        if let Some(ref path) = self.output {
            config.output.file = Some(path.clone());
        }

        if let Some(secs) = self.poll_interval {
            config.monitor.poll_interval_secs = secs;
        }

        if !self.operators.is_empty() {
            config.log_list.operators = self.operators.clone();
        }
    }

    /// Log level forced by flags, if any
    pub fn log_level(&self) -> Option<&str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }
}
