//! `INSERT` statement generation.
//!
//! The statement shape is fixed:
//!
//! ```text
//! INSERT INTO <table> (<target>, ...) VALUES ('<value>', ...), (...);
//! ```
//!
//! Every value is rendered as a quoted string literal regardless of the cell
//! type. Nothing is executed.

use itertools::Itertools;
use log::debug;

use crate::{
    cell::{Row, cell_text},
    error::{ConvertError, ConvertResult},
    escape::quote_literal,
    mapping::Mapping,
};

/// Separator placed between row tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowSeparator {
    #[default]
    Inline,
    Newline,
}

impl RowSeparator {
    fn as_str(self) -> &'static str {
        match self {
            RowSeparator::Inline => ", ",
            RowSeparator::Newline => ",\n",
        }
    }
}

/// Whether source columns that were never mapped or excluded block generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmappedColumns {
    #[default]
    Drop,
    Require,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlOptions {
    pub row_separator: RowSeparator,
    pub unmapped: UnmappedColumns,
}

/// Builds one `INSERT` statement from the data rows (header row excluded).
///
/// The mapping's slots define the source column order, so a slot's position is
/// also the index of its cell in every row. Output columns are the distinct
/// mapped targets in source order; when several sources share a target, the
/// first one supplies the values.
pub fn generate(
    table_name: &str,
    mapping: &Mapping,
    target_columns: &[String],
    rows: &[Row],
    options: &SqlOptions,
) -> ConvertResult<String> {
    let table_name = table_name.trim();
    if table_name.is_empty() {
        return Err(ConvertError::validation("Table name cannot be empty"));
    }
    if target_columns.is_empty() || target_columns.iter().any(|c| c.trim().is_empty()) {
        return Err(ConvertError::validation("Target columns cannot be empty"));
    }

    let active = mapping.active_targets();
    if active.is_empty() {
        return Err(ConvertError::validation("No columns are mapped"));
    }
    if let Some((target, _)) = active
        .iter()
        .find(|(target, _)| !target_columns.iter().any(|column| column == target))
    {
        return Err(ConvertError::validation(format!(
            "Mapped target '{target}' is not in the target column list"
        )));
    }
    if options.unmapped == UnmappedColumns::Require {
        let unset = mapping.unset_sources();
        if !unset.is_empty() {
            return Err(ConvertError::validation(format!(
                "Please complete the mapping for all columns (unmapped: {})",
                unset.join(", ")
            )));
        }
    }
    if rows.is_empty() {
        return Err(ConvertError::validation("The sheet has no data rows to insert"));
    }

    debug!(
        "Generating INSERT for {} row(s) x {} column(s)",
        rows.len(),
        active.len()
    );
    let columns = active.iter().map(|(target, _)| *target).join(", ");
    let values = rows
        .iter()
        .map(|row| {
            let tuple = active
                .iter()
                .map(|(_, index)| quote_literal(&cell_text(row, *index)))
                .join(", ");
            format!("({tuple})")
        })
        .join(options.row_separator.as_str());

    Ok(format!("INSERT INTO {table_name} ({columns}) VALUES {values};"))
}
