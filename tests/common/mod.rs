#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use zip::{ZipWriter, write::SimpleFileOptions};

/// A cell written into a generated workbook.
#[derive(Debug, Clone)]
pub enum XCell {
    Text(&'static str),
    Inline(&'static str),
    Number(f64),
    Bool(bool),
    Blank,
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a single-sheet workbook named `Sheet1`.
    pub fn write_xlsx(&self, name: &str, rows: &[Vec<XCell>]) -> PathBuf {
        self.write_workbook(name, &[("Sheet1", rows.to_vec())])
    }

    /// Writes a workbook with one worksheet per `(sheet name, rows)` pair.
    /// Text cells go through the shared string table.
    pub fn write_workbook(&self, name: &str, sheets: &[(&str, Vec<Vec<XCell>>)]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let file = File::create(&path).expect("create workbook");
        let mut zip = ZipWriter::new(file);

        let mut shared: Vec<&'static str> = Vec::new();
        let mut sheet_xml = Vec::new();
        for (_, rows) in sheets {
            sheet_xml.push(worksheet_xml(rows, &mut shared));
        }

        put(&mut zip, "[Content_Types].xml", CONTENT_TYPES);
        put(&mut zip, "_rels/.rels", ROOT_RELS);

        let mut workbook = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (idx, (sheet_name, _)) in sheets.iter().enumerate() {
            let n = idx + 1;
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
                xml_escape(sheet_name)
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            ));
        }
        let shared_id = sheets.len() + 1;
        rels.push_str(&format!(
            r#"<Relationship Id="rId{shared_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#
        ));
        workbook.push_str("</sheets></workbook>");
        rels.push_str("</Relationships>");

        put(&mut zip, "xl/workbook.xml", &workbook);
        put(&mut zip, "xl/_rels/workbook.xml.rels", &rels);
        for (idx, xml) in sheet_xml.iter().enumerate() {
            put(
                &mut zip,
                &format!("xl/worksheets/sheet{}.xml", idx + 1),
                xml,
            );
        }

        let mut strings = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
            shared.len()
        );
        for text in &shared {
            strings.push_str(&format!("<si><t xml:space=\"preserve\">{}</t></si>", xml_escape(text)));
        }
        strings.push_str("</sst>");
        put(&mut zip, "xl/sharedStrings.xml", &strings);

        zip.finish().expect("finish workbook");
        path
    }
}

fn put(zip: &mut ZipWriter<File>, name: &str, contents: &str) {
    zip.start_file(name, SimpleFileOptions::default()).expect("start zip entry");
    zip.write_all(contents.as_bytes()).expect("write zip entry");
}

fn worksheet_xml(rows: &[Vec<XCell>], shared: &mut Vec<&'static str>) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row_idx, row) in rows.iter().enumerate() {
        let r = row_idx + 1;
        xml.push_str(&format!(r#"<row r="{r}">"#));
        for (col_idx, cell) in row.iter().enumerate() {
            let reference = format!("{}{r}", column_letter(col_idx));
            match cell {
                XCell::Text(text) => {
                    let index = match shared.iter().position(|s| s == text) {
                        Some(index) => index,
                        None => {
                            shared.push(*text);
                            shared.len() - 1
                        }
                    };
                    xml.push_str(&format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#));
                }
                XCell::Inline(text) => xml.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    xml_escape(text)
                )),
                XCell::Number(n) => {
                    xml.push_str(&format!(r#"<c r="{reference}"><v>{n}</v></c>"#))
                }
                XCell::Bool(b) => xml.push_str(&format!(
                    r#"<c r="{reference}" t="b"><v>{}</v></c>"#,
                    u8::from(*b)
                )),
                XCell::Blank => xml.push_str(&format!(r#"<c r="{reference}" s="1"/>"#)),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn column_letter(idx: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = idx + 1;
    while remaining > 0 {
        letters.push((b'A' + ((remaining - 1) % 26) as u8) as char);
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

/// The workbook used across the CLI tests: `ID, Name, Email` with two people.
pub fn people_rows() -> Vec<Vec<XCell>> {
    vec![
        vec![XCell::Text("ID"), XCell::Text("Name"), XCell::Text("Email")],
        vec![
            XCell::Number(1.0),
            XCell::Text("John"),
            XCell::Text("john@test.com"),
        ],
        vec![
            XCell::Number(2.0),
            XCell::Text("Jane O'Neil"),
            XCell::Text("jane@test.com"),
        ],
    ]
}
