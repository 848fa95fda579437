use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Log to stderr at `info` (or `debug` when verbose); `RUST_LOG` takes precedence.
///
/// Keep the returned handle alive for the duration of the program.
pub fn setup_logging(verbose: bool) -> Result<LoggerHandle, FlexiLoggerError> {
    let base_level = if verbose { "debug" } else { "info" };

    Logger::try_with_env_or_str(base_level)?
        .log_to_stderr()
        .format(flexi_logger::colored_default_format)
        .start()
}
