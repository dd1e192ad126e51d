use std::fs::OpenOptions;

use anyhow::{Context, Result};
use log::LevelFilter;

/// Map the `--verbosity` level (-1..=3) to a log filter.
fn level_filter(verbosity: i8) -> LevelFilter {
    match verbosity {
        i8::MIN..=-1 => LevelFilter::Off,
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Initialize logging to stderr, or append to a file when `logtofile`
/// names one.
pub fn init(verbosity: i8, logtofile: Option<&String>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level_filter(verbosity));
    if let Some(path) = logtofile.filter(|p| !p.is_empty()) {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {path}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(level_filter(-1), LevelFilter::Off);
        assert_eq!(level_filter(0), LevelFilter::Error);
        assert_eq!(level_filter(1), LevelFilter::Warn);
        assert_eq!(level_filter(2), LevelFilter::Info);
        assert_eq!(level_filter(3), LevelFilter::Debug);
    }
}
