use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use anyhow::{Context, Result};
use roxmltree::{Document, Node};
use zip::ZipArchive;

/// Gap written between table cells so the table parser sees column boundaries.
const CELL_SEPARATOR: &str = "    ";

pub fn extract_docx_text(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("failed to open DOCX: {}", path.display()))?;
    extract_docx_text_from_reader(file)
}

/// Returns the body text of a DOCX archive: one line per paragraph and one
/// line per table row, with cells separated by a run of spaces.
pub fn extract_docx_text_from_reader<R>(reader: R) -> Result<String>
where
    R: Read + Seek,
{
    let mut archive = ZipArchive::new(reader).context("DOCX is not a valid ZIP archive")?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("DOCX missing word/document.xml")?
        .read_to_string(&mut document_xml)
        .context("failed to read word/document.xml")?;

    let doc = Document::parse(&document_xml).context("failed to parse DOCX XML")?;

    let Some(body) = doc
        .descendants()
        .find(|node| is_element(node, "body"))
    else {
        return Ok(String::new());
    };

    let mut lines = Vec::new();
    for block in body.children().filter(|node| node.is_element()) {
        match block.tag_name().name() {
            "p" => lines.push(paragraph_text(block)),
            "tbl" => lines.extend(table_lines(block)),
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

/// Rows of `table` itself; nested tables are flattened into their parent cell.
fn table_lines(table: Node) -> Vec<String> {
    table
        .children()
        .filter(|node| is_element(node, "tr"))
        .map(|row| {
            row.children()
                .filter(|node| is_element(node, "tc"))
                .map(cell_text)
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR)
        })
        .filter(|line| !line.is_empty())
        .collect()
}

fn cell_text(cell: Node) -> String {
    cell.descendants()
        .filter(|node| is_element(node, "p"))
        .map(paragraph_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn paragraph_text(paragraph: Node) -> String {
    paragraph
        .descendants()
        .filter_map(|node| {
            if is_element(&node, "t") {
                node.text()
            } else if is_element(&node, "tab") {
                Some("\t")
            } else {
                None
            }
        })
        .collect()
}

fn is_element(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Table of Benefits for Domestic Cover</w:t></w:r></w:p>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Plan</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>Sum </w:t></w:r><w:r><w:t>Insured</w:t></w:r></w:p></w:tc>
      </w:tr>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Gold</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>100000</w:t></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
    <w:p><w:r><w:t>Exclusions - Domestic Cover</w:t></w:r></w:p>
    <w:p><w:r><w:t>Gold</w:t></w:r><w:r><w:tab/><w:t>excludes dental.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn tables_become_whitespace_separated_rows() {
        let text = extract_docx_text_from_reader(Cursor::new(docx_bytes(DOCUMENT_XML))).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Table of Benefits for Domestic Cover",
                "Plan    Sum Insured",
                "Gold    100000",
                "Exclusions - Domestic Cover",
                "Gold\texcludes dental.",
            ]
        );
    }

    #[test]
    fn nested_table_rows_are_emitted_once() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Plan</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>Cover</w:t></w:r></w:p></w:tc>
      </w:tr>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Gold</w:t></w:r></w:p></w:tc>
        <w:tc>
          <w:tbl>
            <w:tr>
              <w:tc><w:p><w:r><w:t>Dental</w:t></w:r></w:p></w:tc>
              <w:tc><w:p><w:r><w:t>5000</w:t></w:r></w:p></w:tc>
            </w:tr>
          </w:tbl>
          <w:p/>
        </w:tc>
      </w:tr>
    </w:tbl>
  </w:body>
</w:document>"#;

        let text = extract_docx_text_from_reader(Cursor::new(docx_bytes(xml))).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["Plan    Cover", "Gold    Dental 5000"]
        );
    }

    #[test]
    fn missing_document_part_is_an_error() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_docx_text_from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn non_zip_input_is_an_error() {
        assert!(extract_docx_text_from_reader(Cursor::new(b"plain text".to_vec())).is_err());
    }
}
