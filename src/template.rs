use std::io::Write;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::TemplateArgs,
    io_utils, load_session,
    mapping::MappingFile,
    session::SessionOptions,
};

/// Writes a mapping file listing every source column, pre-filled with the
/// targets auto-mapping could match.
pub fn execute(args: &TemplateArgs) -> Result<()> {
    let mut session = load_session(&args.source, SessionOptions::default())?;
    session
        .set_target_columns(&args.columns)
        .context("Parsing --columns")?;
    let matched = session.auto_map()?;

    let unmatched = session.mapping().unset_sources();
    if !unmatched.is_empty() {
        warn!(
            "No matching target for source column(s): {}",
            unmatched.join(", ")
        );
    }

    let targets = session
        .target_columns()
        .context("Target columns were not recorded")?;
    let file = MappingFile::from_mapping(args.table.as_deref(), targets, session.mapping());
    let yaml = file.to_yaml_string()?;

    let mut writer = io_utils::open_output(args.output.as_deref())?;
    writer
        .write_all(yaml.as_bytes())
        .context("Writing mapping template")?;
    writer.flush().context("Flushing mapping template")?;

    info!(
        "Mapping template with {matched} of {} column(s) matched -> {}",
        file.columns.len(),
        io_utils::describe_output(args.output.as_deref())
    );
    Ok(())
}
