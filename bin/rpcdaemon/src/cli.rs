//! CLI surface (spec.md §6 "CLI surface"): flags, parse-time validation, and
//! the effective remote endpoint the rest of `main` dials.

use clap::Parser;
use rpcdaemon_concurrency::WaitMode;
use rpcdaemon_errors::CliError;
use std::path::PathBuf;

/// Command-line options for the rpcdaemon gateway (spec.md §6).
#[derive(Debug, Parser)]
#[command(name = "rpcdaemon", about = "Read-oriented JSON-RPC gateway fronting an Ethereum execution node")]
pub struct Args {
    /// Path to a local store. This build implements only the remote gRPC
    /// path (C4); when `target` is absent, this is read back as the dial
    /// endpoint instead of being opened directly (see DESIGN.md, "chaindata
    /// vs target").
    #[arg(long)]
    pub chaindata: Option<PathBuf>,

    /// Remote node endpoint, e.g. `http://127.0.0.1:9090`.
    #[arg(long)]
    pub target: Option<String>,

    /// `host:port` for the general JSON-RPC HTTP listener.
    #[arg(long, default_value = "127.0.0.1:8545")]
    pub http_port: String,

    /// `host:port` for the consensus-client engine-API listener.
    #[arg(long, default_value = "127.0.0.1:8551")]
    pub engine_port: String,

    /// Comma-separated namespace list (spec.md §4.11), e.g. `eth,net,web3`.
    #[arg(long, default_value = "eth,debug,trace,erigon,net,web3,txpool,parity")]
    pub api_spec: String,

    /// Number of contexts in the request-dispatch pool (spec.md §4.2, C3);
    /// must be greater than zero.
    #[arg(long, default_value_t = 4)]
    pub num_contexts: usize,

    /// Worker threads per multi-threaded context (spec.md §4.2); must be
    /// greater than zero.
    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    /// `tracing_subscriber::EnvFilter` directive string.
    #[arg(long, default_value = "info")]
    pub log_verbosity: String,

    /// Idle-loop policy shared by every context (spec.md §4.1).
    #[arg(long, value_enum, default_value = "blocking")]
    pub wait_mode: WaitMode,
}

impl Args {
    /// Validate the parsed CLI surface (spec.md §6: "Invalid values exit
    /// non-zero with a descriptive message").
    pub fn validate(&self) -> Result<(), CliError> {
        if self.chaindata.is_none() && self.target.is_none() {
            return Err(CliError::NoBackendConfigured);
        }
        if self.num_contexts == 0 {
            return Err(CliError::ZeroResource("num_contexts"));
        }
        if self.num_workers == 0 {
            return Err(CliError::ZeroResource("num_workers"));
        }
        Ok(())
    }

    /// The effective remote endpoint: `target` if given, else `chaindata`
    /// read back as a connection string.
    pub fn endpoint(&self) -> String {
        self.target.clone().unwrap_or_else(|| {
            self.chaindata.as_ref().expect("validate() ensures one of chaindata/target is set").to_string_lossy().into_owned()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_when_neither_backend_is_set() {
        let args = Args::parse_from(["rpcdaemon"]);
        assert!(matches!(args.validate(), Err(CliError::NoBackendConfigured)));
    }

    #[test]
    fn accepts_target_only() {
        let args = Args::parse_from(["rpcdaemon", "--target", "http://127.0.0.1:9090"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.endpoint(), "http://127.0.0.1:9090");
    }

    #[test]
    fn falls_back_to_chaindata_as_endpoint() {
        let args = Args::parse_from(["rpcdaemon", "--chaindata", "/tmp/chaindata"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.endpoint(), "/tmp/chaindata");
    }

    #[test]
    fn rejects_zero_contexts() {
        let args = Args::parse_from(["rpcdaemon", "--target", "http://127.0.0.1:9090", "--num-contexts", "0"]);
        assert!(matches!(args.validate(), Err(CliError::ZeroResource("num_contexts"))));
    }

    #[test]
    fn rejects_zero_workers() {
        let args = Args::parse_from(["rpcdaemon", "--target", "http://127.0.0.1:9090", "--num-workers", "0"]);
        assert!(matches!(args.validate(), Err(CliError::ZeroResource("num_workers"))));
    }

    #[test]
    fn default_wait_mode_parses_as_blocking() {
        let args = Args::parse_from(["rpcdaemon", "--target", "http://127.0.0.1:9090"]);
        assert_eq!(args.wait_mode, WaitMode::Blocking);
    }
}
