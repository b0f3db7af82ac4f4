use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, instrument};

use crate::{
    aggregate::Fold,
    config::ReplayConfig,
    error::WatchError,
    replay::{json_registry, read_frames, replay},
};

#[derive(Parser, Debug)]
#[command(name = "watch_property", about = "Replay a sequence of object states through a change probe", long_about = None)]
pub struct Cli {
    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub commands: CliCommands,
}

#[derive(Subcommand, Debug)]
pub enum CliCommands {
    /// Poll once per frame of a JSON array of objects and print whether the watched keys changed
    #[command(alias = "r")]
    Replay {
        /// JSON file containing an array of objects
        frames: PathBuf,
        /// Key to watch, repeat for several keys
        #[arg(short, long = "key")]
        keys: Vec<String>,
        /// Combine several keys with any or all
        #[arg(short, long, value_enum)]
        fold: Option<Fold>,
        /// Keep comparing against the first frame's values, `--retain false` turns it off again
        #[arg(short, long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_bool)]
        retain: Option<bool>,
        /// Name of the predicate used to compare values (`not_equal` or `type_changed`)
        #[arg(short, long)]
        predicate: Option<String>,
        /// TOML file with default settings, overridden by the other arguments
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print each round as a JSON object
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// # Documentation
    /// The log file given on the command line, or else the one in the replay config file
    ///
    /// # Errors
    /// Returns an error if the config file can't be read
    pub fn log_file(&self) -> Result<Option<PathBuf>, WatchError> {
        if self.log_file.is_some() {
            return Ok(self.log_file.clone());
        }

        match &self.commands {
            CliCommands::Replay {
                config: Some(config), ..
            } => Ok(ReplayConfig::from_file(config)?.log_file),
            CliCommands::Replay { .. } => Ok(None),
        }
    }
}

/// # Documentation
/// Merge the arguments over the config file, arguments which weren't given leave the file's values alone
fn merge_config(
    base: Option<ReplayConfig>,
    keys: Vec<String>,
    fold: Option<Fold>,
    retain: Option<bool>,
    predicate: Option<String>,
) -> ReplayConfig {
    let mut config = base.unwrap_or_default();

    if !keys.is_empty() {
        config.keys = keys;
    }
    if fold.is_some() {
        config.fold = fold;
    }
    if let Some(retain) = retain {
        config.probe.retain_initial = retain;
    }
    if predicate.is_some() {
        config.probe.predicate = predicate;
    }

    config
}

/// # Errors
/// Returns an error if the frames or config can't be read, or the watcher can't be built
#[instrument(skip(cli))]
pub fn evaluate_cli(cli: Cli) -> Result<(), WatchError> {
    match cli.commands {
        CliCommands::Replay {
            frames,
            keys,
            fold,
            retain,
            predicate,
            config,
            json,
        } => {
            let base = config.as_deref().map(ReplayConfig::from_file).transpose()?;
            let config = merge_config(base, keys, fold, retain, predicate);

            info!("Replay config: {config:?}");

            let frames = read_frames(&frames)?;
            let rounds = replay(&frames, &config, &json_registry())?;

            for round in rounds {
                if json {
                    println!("{}", serde_json::to_string(&round)?);
                } else {
                    println!("{round}");
                }
            }
        }
    }

    Ok(())
}

/// # Errors
/// Returns an error if the bool was not in the correct format
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(format!("Invalid value '{other}' for boolean. Use true/false or 1/0.")),
    }
}
