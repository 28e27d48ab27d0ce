//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Log to stderr so command output on stdout stays clean. `RUST_LOG`
/// overrides the default filter.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "mcpscope=debug,mcpscope_auth=debug,mcpscope_mcp=debug,mcpscope_gateway=debug,tower_http=debug"
    } else {
        "mcpscope=warn,mcpscope_auth=warn,mcpscope_mcp=warn,mcpscope_gateway=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
