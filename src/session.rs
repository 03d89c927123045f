//! A single file-load session.
//!
//! The session owns everything one conversion needs: the source columns, the
//! decoded data rows (cached so generation never re-reads the file), the target
//! column list, and the mapping. Loading a file or changing the target list
//! resets the mapping.
//!
//! Loads are identified by [`LoadTicket`]s. Starting a load supersedes every
//! earlier ticket, so a slow read that finishes late cannot overwrite a newer
//! one.

use log::{debug, info};

use crate::{
    cell::{Row, Table},
    error::{ConvertError, ConvertResult},
    headers::{HeaderSet, extract_headers},
    mapping::{DuplicateTargets, Mapping, MappingFile, TargetColumns},
    sql::{self, SqlOptions},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub duplicate_targets: DuplicateTargets,
    pub sql: SqlOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Default)]
pub struct Session {
    options: SessionOptions,
    headers: Option<HeaderSet>,
    rows: Vec<Row>,
    targets: Option<TargetColumns>,
    mapping: Mapping,
    latest_load: u64,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Session {
            options,
            ..Session::default()
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Starts a load, cancelling any load still in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_load += 1;
        LoadTicket(self.latest_load)
    }

    /// Installs a decoded table for `ticket`. A superseded ticket or a table
    /// without a header row leaves the session untouched.
    pub fn complete_load(&mut self, ticket: LoadTicket, table: Table) -> ConvertResult<&HeaderSet> {
        if ticket.0 != self.latest_load {
            debug!(
                "Discarding load {} superseded by load {}",
                ticket.0, self.latest_load
            );
            return Err(ConvertError::Superseded);
        }
        let headers = extract_headers(&table)?;
        self.rows = table.into_iter().skip(1).collect();
        self.mapping = Mapping::new(&headers.columns);
        info!(
            "Loaded {} source column(s) and {} data row(s)",
            headers.len(),
            headers.row_count
        );
        Ok(self.headers.insert(headers))
    }

    pub fn load(&mut self, table: Table) -> ConvertResult<&HeaderSet> {
        let ticket = self.begin_load();
        self.complete_load(ticket, table)
    }

    pub fn headers(&self) -> Option<&HeaderSet> {
        self.headers.as_ref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn target_columns(&self) -> Option<&TargetColumns> {
        self.targets.as_ref()
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Parses a comma-separated target list. On error the previous list and
    /// mapping stay in place.
    pub fn set_target_columns(&mut self, raw: &str) -> ConvertResult<&TargetColumns> {
        let targets = TargetColumns::parse(raw)?;
        Ok(self.replace_targets(targets))
    }

    pub fn replace_targets(&mut self, targets: TargetColumns) -> &TargetColumns {
        debug!("Target columns: {:?}", &*targets);
        self.mapping.reset();
        self.targets.insert(targets)
    }

    /// Maps `source` to `target`; an empty `target` excludes the column.
    pub fn set_mapping(&mut self, source: &str, target: &str) -> ConvertResult<()> {
        let targets = self.targets.as_ref().ok_or_else(missing_targets)?;
        self.mapping
            .assign(source, target, targets, self.options.duplicate_targets)
    }

    pub fn auto_map(&mut self) -> ConvertResult<usize> {
        let targets = self.targets.as_ref().ok_or_else(missing_targets)?;
        Ok(self.mapping.auto_map(targets))
    }

    /// Applies a mapping file: its target list (if any) first, then each entry
    /// in file order. Entries without a target stay unmapped.
    pub fn apply_mapping_file(&mut self, file: &MappingFile) -> ConvertResult<()> {
        if !file.target_columns.is_empty() {
            let targets = TargetColumns::from_names(&file.target_columns)?;
            self.replace_targets(targets);
        }
        for entry in &file.columns {
            match entry.target.as_deref() {
                Some(target) => self.set_mapping(&entry.source, target)?,
                None if self.mapping.get(&entry.source).is_none() => {
                    return Err(ConvertError::validation(format!(
                        "Unknown source column '{}'",
                        entry.source
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }

    pub fn generate(&self, table_name: &str) -> ConvertResult<String> {
        if self.headers.is_none() {
            return Err(ConvertError::validation("No file has been loaded"));
        }
        let targets = self.targets.as_ref().ok_or_else(missing_targets)?;
        sql::generate(
            table_name,
            &self.mapping,
            targets,
            &self.rows,
            &self.options.sql,
        )
    }
}

fn missing_targets() -> ConvertError {
    ConvertError::validation("Target columns have not been set")
}
