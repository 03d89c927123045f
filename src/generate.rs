use std::io::Write;

use anyhow::{Context, Result, anyhow};
use log::{debug, info};

use crate::{
    cli::GenerateArgs,
    io_utils, load_session,
    mapping::{DuplicateTargets, MappingFile, TargetColumns, parse_map_pair},
    session::{Session, SessionOptions},
    sql::{RowSeparator, SqlOptions, UnmappedColumns},
};

pub fn execute(args: &GenerateArgs) -> Result<()> {
    let options = session_options(args);
    let mapping_file = match &args.mapping {
        Some(path) => Some(
            MappingFile::load(path).with_context(|| format!("Loading mapping from {path:?}"))?,
        ),
        None => None,
    };

    let mut session = load_session(&args.source, options)?;
    configure_mapping(&mut session, args, mapping_file.as_ref())?;

    let table_name = args
        .table
        .as_deref()
        .or_else(|| mapping_file.as_ref().and_then(|file| file.table.as_deref()))
        .ok_or_else(|| anyhow!("Table name cannot be empty: pass --table or set `table` in the mapping file"))?;
    let statement = session
        .generate(table_name)
        .context("Generating INSERT statement")?;

    let mut writer = io_utils::open_output(args.output.as_deref())?;
    writeln!(writer, "{statement}").context("Writing SQL output")?;
    writer.flush().context("Flushing SQL output")?;

    info!(
        "INSERT for {} row(s) into '{}' written to {}",
        session.rows().len(),
        table_name.trim(),
        io_utils::describe_output(args.output.as_deref())
    );
    Ok(())
}

fn session_options(args: &GenerateArgs) -> SessionOptions {
    SessionOptions {
        duplicate_targets: if args.allow_duplicate_targets {
            DuplicateTargets::Allow
        } else {
            DuplicateTargets::Reject
        },
        sql: SqlOptions {
            row_separator: if args.multiline {
                RowSeparator::Newline
            } else {
                RowSeparator::Inline
            },
            unmapped: if args.require_complete {
                UnmappedColumns::Require
            } else {
                UnmappedColumns::Drop
            },
        },
    }
}

/// `--columns` replaces the mapping file's target list; the file's entries
/// apply next, then `--map` pairs, then auto-mapping for whatever is still
/// unset.
fn configure_mapping(
    session: &mut Session,
    args: &GenerateArgs,
    mapping_file: Option<&MappingFile>,
) -> Result<()> {
    let mut effective = mapping_file.cloned().unwrap_or_default();
    if let Some(columns) = &args.columns {
        effective.target_columns = TargetColumns::parse(columns)
            .context("Parsing --columns")?
            .into_inner();
    }
    if effective.target_columns.is_empty() {
        return Err(anyhow!(
            "Target columns cannot be empty: pass --columns or set `target_columns` in the mapping file"
        ));
    }
    session
        .apply_mapping_file(&effective)
        .context("Applying column mapping")?;

    for raw in &args.maps {
        let (source, target) = parse_map_pair(raw)?;
        session
            .set_mapping(&source, &target)
            .with_context(|| format!("Applying --map {raw}"))?;
    }
    if args.auto_map {
        let assigned = session.auto_map()?;
        debug!("Auto-mapping assigned {assigned} column(s)");
    }
    Ok(())
}
