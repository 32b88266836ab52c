/// Errors returned from `bin/rpcdaemon`'s `main` (spec §6 CLI surface).
///
/// Invalid CLI values must exit non-zero with a descriptive message; this
/// enum is that message.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Neither `--chaindata` nor `--target` was supplied; at least one is
    /// required.
    #[error("either --chaindata or --target must be provided")]
    NoBackendConfigured,

    /// `--num-contexts` or `--num-workers` was zero.
    #[error("{0} must be greater than zero")]
    ZeroResource(&'static str),

    /// `--wait-mode` carried a value outside the known enum.
    #[error("unknown wait mode: {0}")]
    UnknownWaitMode(String),

    /// Failed to bind an HTTP or engine listener address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
