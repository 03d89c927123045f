use std::collections::HashSet;

use crate::{
    cell::Table,
    error::{ConvertError, ConvertResult},
};

/// Source columns read from the first row of a table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderSet {
    pub columns: Vec<String>,
    /// Number of data rows below the header row.
    pub row_count: usize,
}

impl HeaderSet {
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn synthetic_name(idx: usize) -> String {
    format!("column_{}", idx + 1)
}

/// Trims and stringifies the header row. Blank header cells get a
/// `column_<n>` name; repeated names are rejected since columns are addressed
/// by name.
pub fn extract_headers(table: &Table) -> ConvertResult<HeaderSet> {
    let header_row = table
        .first()
        .ok_or_else(|| ConvertError::decode("The sheet does not contain a header row"))?;
    if header_row.iter().all(|cell| cell.as_display().trim().is_empty()) {
        return Err(ConvertError::decode("The header row is empty"));
    }

    let mut seen = HashSet::with_capacity(header_row.len());
    let mut columns = Vec::with_capacity(header_row.len());
    for (idx, cell) in header_row.iter().enumerate() {
        let text = cell.as_display();
        let trimmed = text.trim();
        let name = if trimmed.is_empty() {
            synthetic_name(idx)
        } else {
            trimmed.to_string()
        };
        if !seen.insert(name.clone()) {
            return Err(ConvertError::decode(format!(
                "Duplicate header '{name}' at column {}",
                idx + 1
            )));
        }
        columns.push(name);
    }

    Ok(HeaderSet {
        columns,
        row_count: table.len() - 1,
    })
}
