use std::{fs::OpenOptions, path::Path, sync::Mutex};

use time::macros::format_description;
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{time::LocalTime, writer::BoxMakeWriter},
};

use crate::error::WatchError;

/// # Documentation
/// Install the global tracing subscriber, appending to `log_file` when given and writing to stderr otherwise
///
/// # Errors
/// Returns an error if the log file can't be opened or created
///
/// # Panics
/// Panics if a global subscriber has already been set
pub fn init_logging(log_file: Option<&Path>) -> Result<(), WatchError> {
    // Set panic hook
    std::panic::set_hook(Box::new(|info| {
        error!("Panic: {info}");
    }));

    // Filter the logs to the specified level (Use WARN as default)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        // Custom Time format
        .with_timer(LocalTime::new(format_description!(
            "[day]-[month repr:short]-[year] [hour]:[minute]:[second].[subsecond digits:9] [offset_hour]:[offset_minute]"
        )))
        .init();

    Ok(())
}
