//! Turns an input file into a decoded [`Table`].
//!
//! `.xlsx` workbooks go through [`crate::xlsx`]; `.csv`/`.tsv` files (and `-`
//! for stdin) are read as delimited text. Every failure surfaces as
//! [`ConvertError::Decode`] carrying the underlying message.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    cell::{Cell, Row, Table},
    error::{ConvertError, ConvertResult},
    io_utils,
    xlsx::Workbook,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Xlsx,
    Delimited(u8),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub sheet: Option<String>,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            sheet: None,
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

pub fn detect_format(path: &Path, delimiter: Option<u8>) -> ConvertResult<SourceFormat> {
    if io_utils::has_extension(path, "xlsx") {
        Ok(SourceFormat::Xlsx)
    } else if io_utils::is_dash(path)
        || io_utils::has_extension(path, "csv")
        || io_utils::has_extension(path, "tsv")
    {
        Ok(SourceFormat::Delimited(io_utils::resolve_input_delimiter(
            path, delimiter,
        )))
    } else {
        Err(ConvertError::decode(format!(
            "Unsupported input {path:?}: expected an .xlsx, .csv or .tsv file"
        )))
    }
}

pub fn read_table(path: &Path, options: &LoadOptions) -> ConvertResult<Table> {
    let table = match detect_format(path, options.delimiter)? {
        SourceFormat::Xlsx => read_workbook_sheet(path, options.sheet.as_deref())?,
        SourceFormat::Delimited(delimiter) => {
            if options.sheet.is_some() {
                return Err(ConvertError::validation(
                    "--sheet only applies to .xlsx workbooks",
                ));
            }
            read_delimited(path, delimiter, options.encoding)?
        }
    };
    debug!("Decoded {} row(s) from {:?}", table.len(), path);
    Ok(table)
}

pub fn list_sheets(path: &Path) -> ConvertResult<Vec<String>> {
    match detect_format(path, None)? {
        SourceFormat::Xlsx => {
            let workbook = Workbook::open(path).map_err(|err| decode_error(path, err))?;
            Ok(workbook
                .sheet_names()
                .into_iter()
                .map(str::to_string)
                .collect())
        }
        SourceFormat::Delimited(_) => Err(ConvertError::decode(format!(
            "{path:?} is not a workbook and has no sheets"
        ))),
    }
}

fn read_workbook_sheet(path: &Path, sheet: Option<&str>) -> ConvertResult<Table> {
    let mut workbook = Workbook::open(path).map_err(|err| decode_error(path, err))?;
    workbook
        .read_sheet(sheet)
        .map_err(|err| decode_error(path, err))
}

fn read_delimited(path: &Path, delimiter: u8, encoding: &'static Encoding) -> ConvertResult<Table> {
    let input = io_utils::open_input(path).map_err(|err| decode_error(path, err))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(input);

    let mut table = Table::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|err| {
            ConvertError::decode(format!("Reading row {} of {:?}: {err}", idx + 1, path))
        })?;
        let row = record
            .iter()
            .map(|field| {
                io_utils::decode_bytes(field, encoding).map(|text| {
                    if text.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::String(text)
                    }
                })
            })
            .collect::<Result<Row, String>>()
            .map_err(|message| {
                ConvertError::decode(format!("Row {} of {:?}: {message}", idx + 1, path))
            })?;
        table.push(row);
    }
    Ok(table)
}

fn decode_error(path: &Path, err: impl std::fmt::Display) -> ConvertError {
    ConvertError::decode(format!("Error loading file {}: {err}", display_path(path)))
}

fn display_path(path: &Path) -> String {
    if io_utils::is_dash(path) {
        "stdin".to_string()
    } else {
        path.display().to_string()
    }
}
