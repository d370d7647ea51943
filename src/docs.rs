use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;

use calamine::{open_workbook_auto_from_rs, Reader};
use regex::Regex;

use crate::errors::AppError;

/// Raw text pulled out of an uploaded document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub file_type: String,
}

static XML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid XML tag regex"));

/// Extracts plain text from an uploaded document. Dispatches on the file
/// extension; the format-specific parsing is delegated to the respective
/// libraries. Parse failures surface as [`AppError::FileReadError`].
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<ExtractedDocument, AppError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "txt" | "md" | "markdown" => {
            let text = String::from_utf8(bytes.to_vec())
                .map_err(|e| AppError::FileReadError { message: e.to_string() })?;
            Ok(ExtractedDocument { text, file_type: ext })
        }
        "pdf" => {
            let text = pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| AppError::FileReadError { message: format!("PDF parse error: {e}") })?;
            Ok(ExtractedDocument { text, file_type: "pdf".into() })
        }
        "xlsx" | "xls" => {
            let text = extract_spreadsheet(bytes)?;
            Ok(ExtractedDocument { text, file_type: ext })
        }
        "docx" => {
            let text = extract_docx(bytes)?;
            Ok(ExtractedDocument { text, file_type: "docx".into() })
        }
        other => Err(AppError::UnsupportedType {
            mime_type: if other.is_empty() { "unknown".into() } else { format!(".{other}") },
        }),
    }
}

/// All sheets, rows newline-separated, cells tab-separated.
fn extract_spreadsheet(bytes: &[u8]) -> Result<String, AppError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| AppError::FileReadError { message: format!("Spreadsheet parse error: {e}") })?;

    let mut out = String::new();
    for (name, range) in workbook.worksheets() {
        out.push_str(&format!("# Sheet: {name}\n"));
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
    }
    Ok(out)
}

/// A .docx file is a zip; the body text lives in `word/document.xml`.
/// Paragraph closers become newlines, every other tag is stripped.
fn extract_docx(bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::FileReadError { message: format!("docx open error: {e}") })?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::FileReadError { message: format!("docx missing document.xml: {e}") })?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| AppError::FileReadError { message: e.to_string() })?;
    Ok(strip_document_xml(&xml))
}

fn strip_document_xml(xml: &str) -> String {
    let with_breaks = xml.replace("</w:p>", "\n");
    XML_TAG_RE.replace_all(&with_breaks, "").trim().to_string()
}
