pub mod cli;
pub mod columns;
pub mod data;
pub mod error;
pub mod fallback;
pub mod io_utils;
pub mod loader;
pub mod oracle;
pub mod pattern;
pub mod pipeline;
pub mod preview;
pub mod redact;
pub mod strategy;
pub mod table;
pub mod validate;
pub mod vocabulary;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cli::{Cli, Commands, InputArgs},
    loader::{SourceFormat, TabularSource},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_redact", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Redact(args) => redact::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
    }
}

pub(crate) fn source_from_args(args: &InputArgs) -> Result<TabularSource> {
    let format = match &args.format {
        Some(tag) => tag.parse::<SourceFormat>()?,
        None => SourceFormat::from_path(&args.input)?,
    };
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let source = TabularSource::new(&args.input, format)
        .with_delimiter(args.delimiter)
        .with_encoding(encoding)
        .with_sheet(args.sheet.clone());
    debug!(
        "Input {:?} as {} (delimiter '{}', encoding {})",
        source.path,
        source.format,
        printable_delimiter(io_utils::resolve_input_delimiter(&source.path, source.delimiter)),
        source.encoding.name()
    );
    Ok(source)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
