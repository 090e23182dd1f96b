use tracing_subscriber::EnvFilter;

/// Initializes `tracing` with a filter read from the environment variable
/// named in `env`, falling back to `info` when the variable is unset or
/// unparseable.
///
/// The variable name is the operator binary's choice, conventionally
/// `APPSYNTH_OPERATOR_LOG`.
pub fn initialize_logging(env: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(env).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
