use slog::{o, Discard, Drain, FilterLevel, Logger};

use crate::env::ENV_VARS;

pub mod codes;

/// Build the root logger: compact terminal output, filtered by the level
/// in `CATEGORIZER_LOG`, drained off-thread.
pub fn logger(show_debug: bool) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::LogBuilder::new(drain)
        .filter(
            None,
            if show_debug {
                FilterLevel::Debug
            } else {
                FilterLevel::Info
            },
        )
        .parse(ENV_VARS.log_levels().unwrap_or(""))
        .build();
    let drain = slog_async::Async::new(drain)
        .chan_size(20000)
        .build()
        .fuse();
    Logger::root(drain, o!())
}

/// A logger that throws everything away.
pub fn discard() -> Logger {
    Logger::root(Discard, o!())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::info;

    #[test]
    fn root_logger_takes_structured_records() {
        let logger = logger(true).new(o!("component" => "Test"));
        info!(logger, "Caught up"; "code" => codes::LogCode::CatchUpPromoted, "workers" => 2);
    }
}
