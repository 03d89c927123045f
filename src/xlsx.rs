//! Minimal Office Open XML (`.xlsx`) reader.
//!
//! Only what the converter needs is decoded: the sheet list from
//! `xl/workbook.xml` and its relationships, the shared string table, and cell
//! values of a single worksheet. Styles, formulas and number formats are
//! ignored; numeric cells surface as raw numbers.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, Read, Seek},
    path::Path,
};

use log::debug;
use quick_xml::{
    Reader,
    escape::resolve_xml_entity,
    events::{BytesRef, BytesStart, Event},
};
use thiserror::Error;
use zip::{ZipArchive, read::ZipFile, result::ZipError};

use crate::cell::{Cell, Table};

const TAG_SHEET: &[u8] = b"sheet";
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";
const TAG_TEXT: &[u8] = b"t";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_INLINE_STRING: &[u8] = b"is";
const TAG_VALUE: &[u8] = b"v";

/// Worksheet bounds of the OOXML format (`XFD1048576`).
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLUMNS: usize = 16_384;

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

#[derive(Error, Debug)]
pub enum XlsxError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Zip(#[from] ZipError),

    #[error("{0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Workbook part '{0}' is missing")]
    MissingPart(String),

    #[error("Workbook does not contain any sheets")]
    NoSheets,

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Unresolved XML entity '{0}'")]
    Entity(String),

    #[error("Invalid cell reference '{0}'")]
    InvalidReference(String),

    #[error("Cell {reference} holds an invalid value '{value}'")]
    InvalidCell { reference: String, value: String },
}

/// An opened workbook with its sheet list resolved to archive paths.
pub struct Workbook<R: Read + Seek> {
    zip: ZipArchive<R>,
    sheets: Vec<(String, String)>,
}

impl Workbook<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, XlsxError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> Workbook<R> {
    pub fn from_reader(reader: R) -> Result<Self, XlsxError> {
        let mut zip = ZipArchive::new(reader)?;
        let relationships = load_relationships(&mut zip)?;
        let sheets = load_sheets(&mut zip, &relationships)?;
        debug!("Workbook lists {} sheet(s)", sheets.len());
        Ok(Workbook { zip, sheets })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Reads one sheet into a dense table. `None` selects the first sheet.
    pub fn read_sheet(&mut self, name: Option<&str>) -> Result<Table, XlsxError> {
        let path = match name {
            Some(name) => self
                .sheets
                .iter()
                .find(|(sheet, _)| sheet == name)
                .map(|(_, path)| path.clone())
                .ok_or_else(|| XlsxError::SheetNotFound(name.to_string()))?,
            None => self
                .sheets
                .first()
                .map(|(_, path)| path.clone())
                .ok_or(XlsxError::NoSheets)?,
        };
        let shared_strings = load_shared_strings(&mut self.zip)?;
        let cells = load_cells(&mut self.zip, &path, &shared_strings)?;
        Ok(densify(cells))
    }
}

struct XmlReader<B: BufRead> {
    reader: Reader<B>,
    buffer: Vec<u8>,
}

impl<B: BufRead> XmlReader<B> {
    fn new(inner: B) -> Self {
        let mut reader = Reader::from_reader(inner);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);
        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    fn next(&mut self) -> Result<Option<Event<'_>>, XlsxError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

fn find_part<'a, R: Read + Seek>(
    zip: &'a mut ZipArchive<R>,
    name: &str,
) -> Result<Option<ZipFile<'a, R>>, XlsxError> {
    let path = zip
        .file_names()
        .find(|candidate| name.eq_ignore_ascii_case(&candidate.replace('\\', "/")))
        .map(str::to_owned);
    match path.map(|path| zip.by_name(&path)).transpose() {
        Ok(file) => Ok(file),
        Err(ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn attribute(event: &BytesStart<'_>, name: &str) -> Result<Option<String>, XlsxError> {
    match event.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn to_zip_path(target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else if target.starts_with("xl/") {
        target.to_string()
    } else {
        format!("xl/{target}")
    }
}

fn load_relationships<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
) -> Result<HashMap<String, String>, XlsxError> {
    let part = find_part(zip, WORKBOOK_RELS_PATH)?
        .ok_or_else(|| XlsxError::MissingPart(WORKBOOK_RELS_PATH.to_string()))?;
    let mut reader = XmlReader::new(BufReader::new(part));
    let mut relationships = HashMap::new();
    while let Some(event) = reader.next()? {
        if let Event::Start(event) = event
            && event.local_name().as_ref() == TAG_RELATIONSHIP
        {
            let kind = attribute(&event, "Type")?;
            if !kind.is_none_or(|kind| kind.ends_with("/worksheet")) {
                continue;
            }
            if let (Some(id), Some(target)) =
                (attribute(&event, "Id")?, attribute(&event, "Target")?)
            {
                relationships.insert(id, to_zip_path(&target));
            }
        }
    }
    Ok(relationships)
}

fn load_sheets<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> Result<Vec<(String, String)>, XlsxError> {
    let part = find_part(zip, WORKBOOK_PATH)?
        .ok_or_else(|| XlsxError::MissingPart(WORKBOOK_PATH.to_string()))?;
    let mut reader = XmlReader::new(BufReader::new(part));
    let mut sheets = Vec::new();
    while let Some(event) = reader.next()? {
        if let Event::Start(event) = event
            && event.local_name().as_ref() == TAG_SHEET
        {
            let mut name = None;
            let mut id = None;
            for attr in event.attributes() {
                let attr = attr?;
                match attr.key.local_name().as_ref() {
                    b"name" => name = Some(attr.unescape_value()?.into_owned()),
                    b"id" => id = Some(attr.unescape_value()?.into_owned()),
                    _ => {}
                }
            }
            if let Some((name, id)) = name.zip(id)
                && let Some(path) = relationships.get(&id)
            {
                sheets.push((name, path.clone()));
            }
        }
    }
    Ok(sheets)
}

fn load_shared_strings<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Vec<String>, XlsxError> {
    let Some(part) = find_part(zip, SHARED_STRINGS_PATH)? else {
        return Ok(Vec::new());
    };
    let mut reader = XmlReader::new(BufReader::new(part));
    let mut strings = Vec::new();
    while let Some(event) = reader.next()? {
        let is_item = matches!(&event, Event::Start(start) if start.local_name().as_ref() == TAG_SHARED_STRING_ITEM);
        if is_item {
            strings.push(read_text(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    }
    Ok(strings)
}

/// Collects text until `end_tag` closes. Outside of `<v>` only `<t>` runs count,
/// and phonetic runs are skipped.
fn read_text<B: BufRead>(
    reader: &mut XmlReader<B>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, XlsxError> {
    let mut text = String::new();
    let mut in_phonetic = false;
    let mut in_text = is_text_content;
    while let Some(event) = reader.next()? {
        match event {
            Event::End(event) if event.local_name().as_ref() == end_tag => break,
            Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => in_phonetic = true,
            Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => in_phonetic = false,
            Event::Start(event) if !in_phonetic && event.local_name().as_ref() == TAG_TEXT => in_text = true,
            Event::End(event) if event.local_name().as_ref() == TAG_TEXT => in_text = is_text_content,
            Event::Text(event) if in_text => text.push_str(&event.xml_content()?),
            Event::CData(event) if in_text => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) if in_text => push_reference(&mut text, &event)?,
            _ => {}
        }
    }
    Ok(text)
}

fn push_reference(text: &mut String, reference: &BytesRef<'_>) -> Result<(), XlsxError> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|_| XlsxError::Entity(raw.to_string()))?;
        if let Some(ch) = char::from_u32(code) {
            text.push(ch);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    } else {
        return Err(XlsxError::Entity(raw.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    Boolean,
    Text,
}

impl CellKind {
    fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            Some("b") => CellKind::Boolean,
            Some("str") | Some("e") | Some("d") => CellKind::Text,
            _ => CellKind::Number,
        }
    }
}

struct PositionedCell {
    row: usize,
    col: usize,
    value: Cell,
}

fn load_cells<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    path: &str,
    shared_strings: &[String],
) -> Result<Vec<PositionedCell>, XlsxError> {
    let part = find_part(zip, path)?.ok_or_else(|| XlsxError::MissingPart(path.to_string()))?;
    parse_cells(XmlReader::new(BufReader::new(part)), shared_strings)
}

fn parse_cells<B: BufRead>(
    mut reader: XmlReader<B>,
    shared_strings: &[String],
) -> Result<Vec<PositionedCell>, XlsxError> {
    let mut cells = Vec::new();
    let mut next_row = 0usize;
    let mut next_col = 0usize;
    let mut position = (0usize, 0usize);
    let mut kind = CellKind::Number;
    let mut raw: Option<String> = None;

    while let Some(event) = reader.next()? {
        let mut read_tag = None;
        match event {
            Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
                if let Some(row) = attribute(&event, "r")? {
                    next_row = row_to_index(&row).ok_or(XlsxError::InvalidReference(row))?;
                }
                next_col = 0;
            }
            Event::End(event) if event.local_name().as_ref() == TAG_ROW => next_row += 1,
            Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
                position = match attribute(&event, "r")? {
                    Some(reference) => reference_to_index(&reference)
                        .ok_or(XlsxError::InvalidReference(reference))?,
                    None if next_row < MAX_ROWS && next_col < MAX_COLUMNS => (next_row, next_col),
                    None => {
                        return Err(XlsxError::InvalidReference(format!(
                            "R{}C{}",
                            next_row + 1,
                            next_col + 1
                        )));
                    }
                };
                next_col = position.1 + 1;
                kind = CellKind::from_attribute(attribute(&event, "t")?.as_deref());
                raw = None;
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_VALUE => {
                read_tag = Some((TAG_VALUE, true))
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_INLINE_STRING => {
                read_tag = Some((TAG_INLINE_STRING, false))
            }
            Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
                if let Some(value) = raw.take() {
                    let (row, col) = position;
                    let value = decode_cell(kind, value, shared_strings, position)?;
                    cells.push(PositionedCell { row, col, value });
                }
            }
            _ => {}
        }
        if let Some((tag, is_text_content)) = read_tag {
            raw = Some(read_text(&mut reader, tag, is_text_content)?);
        }
    }
    Ok(cells)
}

fn decode_cell(
    kind: CellKind,
    value: String,
    shared_strings: &[String],
    (row, col): (usize, usize),
) -> Result<Cell, XlsxError> {
    let invalid = |value: &str| XlsxError::InvalidCell {
        reference: index_to_reference(row, col),
        value: value.to_string(),
    };
    let cell = match kind {
        CellKind::SharedString => {
            let index = value.trim().parse::<usize>().map_err(|_| invalid(&value))?;
            let text = shared_strings.get(index).ok_or_else(|| invalid(&value))?;
            Cell::String(text.clone())
        }
        CellKind::InlineString | CellKind::Text => Cell::String(value),
        CellKind::Boolean => Cell::Boolean(matches!(value.trim(), "1" | "true")),
        CellKind::Number => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Cell::Empty
            } else {
                Cell::Number(trimmed.parse::<f64>().map_err(|_| invalid(&value))?)
            }
        }
    };
    Ok(cell)
}

/// Lays positioned cells out as rows, anchored at the top-left used cell.
fn densify(cells: Vec<PositionedCell>) -> Table {
    let Some(first_row) = cells.iter().map(|cell| cell.row).min() else {
        return Table::new();
    };
    let first_col = cells.iter().map(|cell| cell.col).min().unwrap_or_default();
    let last_row = cells.iter().map(|cell| cell.row).max().unwrap_or(first_row);
    let mut table: Table = vec![Vec::new(); last_row - first_row + 1];
    for cell in cells {
        let row = &mut table[cell.row - first_row];
        let col = cell.col - first_col;
        if row.len() <= col {
            row.resize(col + 1, Cell::Empty);
        }
        row[col] = cell.value;
    }
    table
}

/// Converts an `A1`-style reference to zero-based `(row, col)`. References
/// outside `A1:XFD1048576` yield `None`.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|ch: char| ch.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = ch.to_ascii_uppercase() as usize - 'A' as usize + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
        if col > MAX_COLUMNS {
            return None;
        }
    }
    Some((row_to_index(digits)?, col - 1))
}

/// Converts a 1-based row number to a zero-based index within the sheet bounds.
fn row_to_index(digits: &str) -> Option<usize> {
    match digits.parse::<usize>() {
        Ok(row @ 1..=MAX_ROWS) => Some(row - 1),
        _ => None,
    }
}

pub fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = col + 1;
    while remaining > 0 {
        letters.push(b'A' + ((remaining - 1) % 26) as u8);
        remaining = (remaining - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_to_index_parses_columns_and_rows() {
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("C12"), Some((11, 2)));
        assert_eq!(reference_to_index("AA3"), Some((2, 26)));
        assert_eq!(reference_to_index("a2"), Some((1, 0)));
        assert_eq!(reference_to_index("12"), None);
        assert_eq!(reference_to_index("A0"), None);
        assert_eq!(reference_to_index("B"), None);
    }

    #[test]
    fn reference_to_index_rejects_out_of_bounds() {
        assert_eq!(reference_to_index("XFD1048576"), Some((1_048_575, 16_383)));
        assert_eq!(reference_to_index("XFE1"), None);
        assert_eq!(reference_to_index("A1048577"), None);
        assert_eq!(reference_to_index("ZZZZZZZZZZZZZZZ1"), None);
        assert_eq!(reference_to_index("A18446744073709551615"), None);
        assert_eq!(reference_to_index("A99999999999999999999999"), None);
    }

    fn worksheet(sheet_data: &str) -> String {
        format!(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
        )
    }

    #[test]
    fn parse_cells_rejects_overflowing_cell_reference() {
        let xml = worksheet(r#"<row r="1"><c r="ZZZZZZZZZZZZZZZ1"><v>1</v></c></row>"#);
        let err = parse_cells(XmlReader::new(xml.as_bytes()), &[]).err().unwrap();
        assert!(matches!(&err, XlsxError::InvalidReference(r) if r == "ZZZZZZZZZZZZZZZ1"));
    }

    #[test]
    fn parse_cells_rejects_rows_beyond_sheet_bounds() {
        let xml = worksheet(
            r#"<row r="1"><c r="A1"><v>1</v></c></row><row r="18446744073709551615"><c r="A18446744073709551615"><v>2</v></c></row>"#,
        );
        let err = parse_cells(XmlReader::new(xml.as_bytes()), &[]).err().unwrap();
        assert_eq!(err.to_string(), "Invalid cell reference '18446744073709551615'");

        let xml = worksheet(r#"<row><c r="A1048577"><v>2</v></c></row>"#);
        assert!(matches!(
            parse_cells(XmlReader::new(xml.as_bytes()), &[]).err().unwrap(),
            XlsxError::InvalidReference(_)
        ));
    }

    #[test]
    fn parse_cells_accepts_prefixed_elements() {
        let xml = r#"<x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:sheetData><x:row r="1"><x:c r="A1" t="inlineStr"><x:is><x:t>id</x:t></x:is></x:c><x:c r="B1"><x:v>7</x:v></x:c></x:row></x:sheetData></x:worksheet>"#;
        let cells = parse_cells(XmlReader::new(xml.as_bytes()), &[]).unwrap();
        let values = cells.into_iter().map(|cell| cell.value).collect::<Vec<_>>();
        assert_eq!(values, vec![Cell::from("id"), Cell::Number(7.0)]);
    }

    #[test]
    fn index_to_reference_round_trips_labels() {
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(9, 25), "Z10");
        assert_eq!(index_to_reference(0, 27), "AB1");
    }

    #[test]
    fn cell_kinds_follow_type_attribute() {
        assert_eq!(CellKind::from_attribute(Some("s")), CellKind::SharedString);
        assert_eq!(CellKind::from_attribute(Some("inlineStr")), CellKind::InlineString);
        assert_eq!(CellKind::from_attribute(Some("e")), CellKind::Text);
        assert_eq!(CellKind::from_attribute(None), CellKind::Number);
    }

    #[test]
    fn decode_cell_resolves_shared_strings_and_numbers() {
        let shared = vec!["Name".to_string()];
        let cell = decode_cell(CellKind::SharedString, "0".into(), &shared, (0, 0)).unwrap();
        assert_eq!(cell, Cell::String("Name".into()));
        let number = decode_cell(CellKind::Number, "42".into(), &shared, (1, 0)).unwrap();
        assert_eq!(number, Cell::Number(42.0));
        let err = decode_cell(CellKind::SharedString, "3".into(), &shared, (1, 1)).unwrap_err();
        assert_eq!(err.to_string(), "Cell B2 holds an invalid value '3'");
    }

    #[test]
    fn densify_anchors_at_top_left_used_cell() {
        let cells = vec![
            PositionedCell { row: 2, col: 1, value: Cell::from("id") },
            PositionedCell { row: 2, col: 2, value: Cell::from("name") },
            PositionedCell { row: 3, col: 2, value: Cell::from("Ann") },
        ];
        let table = densify(cells);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0], vec![Cell::from("id"), Cell::from("name")]);
        assert_eq!(table[1], vec![Cell::Empty, Cell::from("Ann")]);
    }
}
