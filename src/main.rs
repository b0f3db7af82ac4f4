#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

use clap::Parser;
use watch_property::{
    cli::{Cli, evaluate_cli},
    error::WatchError,
    logging::init_logging,
};

fn main() -> Result<(), WatchError> {
    let cli = Cli::parse();

    // Start the logging process
    init_logging(cli.log_file()?.as_deref())?;

    // Evaluate cli commands
    evaluate_cli(cli)?;

    Ok(())
}
