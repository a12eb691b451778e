//! Command line parsing

use crate::error::{PlayerError, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Message shown whenever the argument count is wrong.
pub const WRONG_ARGS: &str = "Wrong number of parameters! Specify only the filename.";

/// Parsed command line.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "termtune", version)]
#[command(about = "Play one audio file with a keyboard-driven terminal status screen")]
pub struct CliArgs {
    /// Audio file to play (mp3, flac, wav, ogg, m4a)
    pub file: PathBuf,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Play a file
    Play(CliArgs),
    /// Print help or version text and exit successfully
    Info(String),
}

/// Parse `args`, program name included.
pub fn parse<I, T>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match CliArgs::try_parse_from(args) {
        Ok(cli) => Ok(Invocation::Play(cli)),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Ok(Invocation::Info(e.render().to_string()))
        }
        Err(e) => Err(PlayerError::Usage(format!("{WRONG_ARGS}\n\n{}", e.render()))),
    }
}
