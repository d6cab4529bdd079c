use std::path::PathBuf;

use clap::{
    builder::{styling::AnsiColor, Styles},
    crate_authors, crate_description, crate_version, Args, ColorChoice, Parser, Subcommand,
    ValueEnum, ValueHint,
};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    author = crate_authors!(),
    about = crate_description!(),
    color = ColorChoice::Auto,
    styles = Styles::styled()
        .header(AnsiColor::BrightMagenta.on_default().bold().underline())
        .usage(AnsiColor::BrightMagenta.on_default().bold().underline())
        .literal(AnsiColor::BrightCyan.on_default().bold())
        .placeholder(AnsiColor::BrightCyan.on_default().bold())
        .valid(AnsiColor::BrightGreen.on_default())
        .invalid(AnsiColor::BrightYellow.on_default())
        .error(AnsiColor::BrightRed.on_default())
)]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Option<Mode>,

    #[command(flatten)]
    pub input: InputOptions,

    /// Set the log level
    #[arg(short, long, value_name = "LEVEL", env = "REED_LOG")]
    pub log: Option<LevelFilter>,
}

#[derive(Subcommand, Eq, PartialEq)]
pub enum Mode {
    /// Scan the source code and print the tokens (default)
    #[command(alias = "t")]
    Tokenize {
        /// Format for the output
        #[arg(short, long, default_value = "text", value_name = "FORMAT")]
        output: OutputFormat,
    },
}

#[derive(Args, Eq, PartialEq)]
pub struct InputOptions {
    /// Source code to scan, overrides PATH
    #[arg(short, long, value_name = "SOURCE", conflicts_with = "path")]
    pub eval: Option<String>,

    /// Read the source from stdin
    #[arg(long, conflicts_with_all = ["eval", "path"])]
    pub stdin: bool,

    /// Path of the source file
    #[arg(value_hint = ValueHint::FilePath, value_name = "PATH")]
    pub path: Option<PathBuf>,
}

#[derive(Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// One token per line: position, kind, spelling and value
    Text,

    /// A JSON array of token records
    Json,
}
