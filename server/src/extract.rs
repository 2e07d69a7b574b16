//! Plain text extraction from uploaded training documents.

use std::io::Read;

use quick_xml::events::Event;

use crate::db::models::TrainingDocumentType;

/// Maximum decompressed size of `word/document.xml` (zip-bomb protection)
const MAX_DOCX_XML_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Extract the text of a document. Failures are total: a document either yields
/// all of its text or an error.
pub fn extract_text(bytes: &[u8], file_type: TrainingDocumentType) -> Result<String, ExtractError> {
    match file_type {
        TrainingDocumentType::Txt => Ok(decode_text(bytes)),
        TrainingDocumentType::Pdf => extract_pdf(bytes),
        TrainingDocumentType::Docx => extract_docx(bytes),
    }
}

/// Decode as UTF-8, falling back to Latin-1 so decoding never fails
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed files
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked".to_owned()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let text = pages
        .iter()
        .filter(|page| !page.trim().is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    Ok(text.trim().to_owned())
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_DOCX_XML_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_DOCX_XML_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_owned(),
        ));
    }

    let paragraphs = docx_paragraphs(&doc_xml)?;
    Ok(paragraphs.join("\n").trim().to_owned())
}

/// Collect the text of each `w:p` paragraph, in document order
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(text)) if in_text => {
                let text = text
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;

    /// Build a minimal DOCX archive with the given `word/document.xml` body
    pub(crate) fn docx_fixture(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(b"<Types/>").unwrap();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn txt_is_decoded_as_utf8() {
        let text = extract_text("Hello\nWorld ✓".as_bytes(), TrainingDocumentType::Txt).unwrap();
        assert_eq!(text, "Hello\nWorld ✓");
    }

    #[test]
    fn txt_falls_back_to_latin1() {
        let bytes = [b'C', b'a', b'f', 0xE9];
        let text = extract_text(&bytes, TrainingDocumentType::Txt).unwrap();
        assert_eq!(text, "Café");
    }

    #[test]
    fn docx_paragraphs_are_joined_with_newlines() {
        let docx = docx_fixture(
            r#"<w:p><w:r><w:t>Vacation</w:t></w:r><w:r><w:t xml:space="preserve"> policy</w:t></w:r></w:p>
<w:p><w:r><w:t>Request leave &amp; wait</w:t><w:tab/><w:t>2 weeks</w:t></w:r></w:p>"#,
        );
        let text = extract_text(&docx, TrainingDocumentType::Docx).unwrap();
        assert_eq!(text, "Vacation policy\nRequest leave & wait\t2 weeks");
    }

    #[test]
    fn docx_without_document_xml_fails() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let result = extract_text(&cursor.into_inner(), TrainingDocumentType::Docx);
        assert!(matches!(result, Err(ExtractError::Docx(_))));
    }

    #[test]
    fn garbage_fails_for_binary_formats() {
        let garbage = b"definitely not a document";
        assert!(extract_text(garbage, TrainingDocumentType::Docx).is_err());
        assert!(extract_text(garbage, TrainingDocumentType::Pdf).is_err());
    }
}
