//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing to stderr.
///
/// Verbosity: default warn, `-v` info, `-vv` debug; `--quiet` errors only.
/// `IMI_LOG` overrides everything via the usual env-filter syntax.
pub fn init(verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };

    let filter = EnvFilter::try_from_env("IMI_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("issuemirror={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize logging: {err}"))?;
    Ok(())
}
