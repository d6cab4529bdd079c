mod cli;

use std::{
    fs::File,
    io::{self, Read},
    process::ExitCode,
};

use clap::Parser;
use colored::Colorize;
use reed_lang::{Errors, Name, Scanned, Scanner, SourceMap, SyntaxTable, Token};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, InputOptions, Mode, OutputFormat};

#[derive(Serialize)]
struct TokenRecord {
    position: u32,
    token: String,
    spelling: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

fn main() -> ExitCode {
    let Cli {
        mode,
        input: InputOptions { eval, stdin, path },
        log,
    } = Cli::parse();
    let Mode::Tokenize { output } = mode.unwrap_or(Mode::Tokenize {
        output: OutputFormat::Text,
    });

    if let Some(level) = log {
        start_logging(level);
    }

    let (name, source) = match read_source(eval, stdin, path) {
        Ok(input) => input,
        Err(error) => {
            eprintln!("{}: {error}", "error".red().bold());

            return ExitCode::FAILURE;
        }
    };

    let table = default_syntax();
    let mut map = SourceMap::new();
    let mut errors = Errors::new();

    map.open_file(name);

    let buffered = errors.save();
    let mut records = Vec::new();

    {
        let mut scanner = Scanner::new(source.as_slice(), &mut map, &mut errors).with_syntax(&table);

        loop {
            let token = scanner.scan();
            let value = match scanner.scanned() {
                Scanned::None => None,
                scanned => Some(scanned.to_string()),
            };

            records.push(TokenRecord {
                position: scanner.position().0,
                token: token.to_string(),
                spelling: scanner.spelling().to_string_lossy().into_owned(),
                value,
            });

            if token == Token::Eof {
                break;
            }
        }
    }

    match output {
        OutputFormat::Text => {
            for record in &records {
                print!(
                    "{:>6} {:<9}",
                    record.position,
                    record.token.bold()
                );

                if !record.spelling.is_empty() {
                    print!(" {}", record.spelling.escape_debug());
                }

                if let Some(value) = &record.value {
                    print!(" {} {}", "=".dimmed(), value.cyan());
                }

                println!();
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&records) {
            Ok(rendered) => println!("{rendered}"),
            Err(error) => eprintln!("{}: {error}", "error".red().bold()),
        },
    }

    let diagnostics = errors.reports().len();

    for report in errors.reports() {
        Errors::display(&map, report);
    }

    errors.clear(buffered);

    if diagnostics > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn read_source(
    eval: Option<String>,
    stdin: bool,
    path: Option<std::path::PathBuf>,
) -> io::Result<(String, Vec<u8>)> {
    if let Some(source) = eval {
        return Ok(("eval".to_string(), source.into_bytes()));
    }

    if stdin {
        let mut source = Vec::new();

        io::stdin().read_to_end(&mut source)?;

        return Ok(("stdin".to_string(), source));
    }

    match path {
        Some(path) => {
            let mut source = Vec::new();

            File::open(&path)?.read_to_end(&mut source)?;

            Ok((path.display().to_string(), source))
        }
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no input: pass a PATH, --eval or --stdin",
        )),
    }
}

/// The operators and blocks Reed ships with; user syntax extends this at
/// parse time, which is beyond the scanner's concern.
fn default_syntax() -> SyntaxTable {
    let mut table = SyntaxTable::new();

    for operator in [
        ":=", "+", "-", "*", "/", "^", "<", "<=", ">", ">=", "=", "<>", ",", ";", ".", "..", "->",
        "&", "|",
    ] {
        table.add_operator(operator);
    }

    table.add_block(Name::new("("), Name::new(")"));
    table.add_block(Name::new("["), Name::new("]"));
    table.add_block(Name::new("{"), Name::new("}"));

    table
}

fn start_logging(level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();
}
