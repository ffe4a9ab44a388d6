use std::io::Write;

use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};

/// Map `-v` occurrences to a level for this crate's own log lines.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Error, // default: only errors
        1 => LevelFilter::Info,  // -v: info and up
        2 => LevelFilter::Debug, // -vv: debug and up
        _ => LevelFilter::Trace, // -vvv: trace and up
    }
}

/// Dependencies (reqwest, hyper, ...) stay at warnings unless `RUST_LOG` says otherwise.
pub fn init_logger(verbosity: u8) {
    let level = level_for(verbosity);

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Warn.min(level));
    builder.filter_module(env!("CARGO_CRATE_NAME"), level);
    builder.parse_default_env();

    builder.format(move |buf, record| {
        let label = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".white().bold(),
            Level::Debug => "DEBUG".bright_black(),
            Level::Trace => "TRACE".bright_black(),
        };

        if level >= LevelFilter::Debug {
            writeln!(buf, "{} [{}] {}", label, record.target(), record.args())
        } else {
            writeln!(buf, "{} {}", label, record.args())
        }
    });

    builder.init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0), LevelFilter::Error);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(3), LevelFilter::Trace);
        assert_eq!(level_for(9), LevelFilter::Trace);
    }
}
