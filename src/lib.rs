pub mod cell;
pub mod cli;
pub mod error;
pub mod escape;
pub mod generate;
pub mod headers;
pub mod io_utils;
pub mod loader;
pub mod mapping;
pub mod preview;
pub mod session;
pub mod sql;
pub mod table;
pub mod template;
pub mod xlsx;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, SourceArgs},
    loader::LoadOptions,
    session::{Session, SessionOptions},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet2sql", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sheets(args) => handle_sheets(&args),
        Commands::Headers(args) => handle_headers(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Template(args) => template::execute(&args),
        Commands::Generate(args) => generate::execute(&args),
    }
}

fn handle_sheets(args: &cli::SheetsArgs) -> Result<()> {
    let sheets = loader::list_sheets(&args.input)
        .with_context(|| format!("Listing sheets of {:?}", args.input))?;
    for name in &sheets {
        println!("{name}");
    }
    info!("Workbook {:?} has {} sheet(s)", args.input, sheets.len());
    Ok(())
}

fn handle_headers(args: &cli::HeadersArgs) -> Result<()> {
    let session = load_session(&args.source, SessionOptions::default())?;
    let Some(headers) = session.headers() else {
        return Ok(());
    };
    let rows = headers
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| vec![(idx + 1).to_string(), name.clone()])
        .collect::<Vec<_>>();
    table::print_table(&["#".to_string(), "source column".to_string()], &rows);
    info!(
        "{} source column(s), {} data row(s) in {:?}",
        headers.len(),
        headers.row_count,
        args.source.input
    );
    Ok(())
}

pub(crate) fn load_options(source: &SourceArgs) -> Result<LoadOptions> {
    Ok(LoadOptions {
        sheet: source.sheet.clone(),
        delimiter: source.delimiter,
        encoding: io_utils::resolve_encoding(source.input_encoding.as_deref())?,
    })
}

/// Reads the input once and installs it into a fresh session.
pub(crate) fn load_session(source: &SourceArgs, options: SessionOptions) -> Result<Session> {
    let load_options = load_options(source)?;
    if let Some(delimiter) = load_options.delimiter {
        debug!("Using delimiter '{}'", printable_delimiter(delimiter));
    }
    let mut session = Session::new(options);
    let ticket = session.begin_load();
    let table = loader::read_table(&source.input, &load_options)?;
    session
        .complete_load(ticket, table)
        .with_context(|| format!("Reading headers from {:?}", source.input))?;
    Ok(session)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
