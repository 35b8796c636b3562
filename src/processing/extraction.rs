//! Text extraction for uploaded documents.
//!
//! The extractor dispatches on [`DocumentFormat`], resolved once from the filename:
//!
//! - PDF: every page's text layer is concatenated in page order. Pages without a usable text
//!   layer (scanned images, unsupported font encodings) contribute an empty string; there is no
//!   OCR fallback.
//! - Plain text (`.txt`, `.data`): strict UTF-8 decoding, returned verbatim.
//! - CSV: rendered back to a right-aligned, whitespace-separated table without an index column
//!   so that the QA and summarization models see a readable layout. Empty or missing cells
//!   render as `NaN`.
//! - Unsupported suffixes produce an empty string rather than an error.

use super::types::{Document, DocumentFormat, ExtractionError};

const MISSING_CELL: &str = "NaN";
const COLUMN_SEPARATOR: &str = "  ";

/// Extract plain text from raw bytes, inferring the format from `filename`.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractionError> {
    extract_with_format(bytes, DocumentFormat::from_filename(filename))
}

/// Extract plain text from an uploaded document using its resolved format.
pub fn extract_document(document: &Document) -> Result<String, ExtractionError> {
    extract_with_format(document.bytes(), document.format())
}

fn extract_with_format(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError> {
    let text = match format {
        DocumentFormat::Pdf => extract_pdf_pages(bytes)?.concat(),
        DocumentFormat::PlainText => String::from_utf8(bytes.to_vec())?,
        DocumentFormat::Tabular => render_table(bytes)?,
        DocumentFormat::Unsupported => String::new(),
    };
    tracing::debug!(
        format = ?format,
        bytes = bytes.len(),
        characters = text.chars().count(),
        "Extracted document text"
    );
    Ok(text)
}

/// Extract the text layer of each PDF page, in page order.
///
/// Fails only when the byte stream cannot be opened as a PDF; per-page failures yield `""`.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let document = lopdf::Document::load_mem(bytes)?;
    let pages = document
        .get_pages()
        .into_keys()
        .map(|page_number| match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(error) => {
                tracing::debug!(page_number, error = %error, "Page has no extractable text");
                String::new()
            }
        })
        .collect();
    Ok(pages)
}

/// Render CSV bytes (header row required) as an aligned text table.
fn render_table(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Ok(String::new());
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(ExtractionError::Tabular(format!(
                "row {} has {} fields, expected at most {}",
                index + 1,
                record.len(),
                headers.len()
            )));
        }
        let row: Vec<String> = (0..headers.len())
            .map(|column| match record.get(column) {
                Some(cell) if !cell.is_empty() => cell.to_string(),
                _ => MISSING_CELL.to_string(),
            })
            .collect();
        rows.push(row);
    }

    let mut widths: Vec<usize> = headers.iter().map(|cell| cell.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let lines: Vec<String> = std::iter::once(&headers)
        .chain(rows.iter())
        .map(|row| format_row(row, &widths))
        .collect();
    Ok(lines.join("\n"))
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:>width$}"))
        .collect::<Vec<_>>()
        .join(COLUMN_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let mut operations = Vec::new();
            if !text.is_empty() {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 24.into()]));
                operations.push(Operation::new("Td", vec![72.into(), 720.into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().expect("encode")));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save pdf");
        bytes
    }

    #[test]
    fn plain_text_is_returned_verbatim() {
        let text = extract_text(b"The patient has mild hypertension.", "report.txt").unwrap();
        assert_eq!(text, "The patient has mild hypertension.");

        let data = extract_text("temp: 37.2\u{b0}C\n".as_bytes(), "vitals.data").unwrap();
        assert_eq!(data, "temp: 37.2\u{b0}C\n");
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let error = extract_text(&[0x66, 0x6f, 0xff, 0xfe], "broken.txt").unwrap_err();
        assert!(matches!(error, ExtractionError::Decode(_)));
    }

    #[test]
    fn unsupported_suffix_yields_empty_text() {
        for name in ["scan.png", "report.docx", "REPORT.TXT", "notes.txt.bak", "csv"] {
            assert_eq!(extract_text(b"anything", name).unwrap(), "", "{name}");
        }
    }

    #[test]
    fn csv_renders_aligned_table_without_index() {
        let text = extract_text(b"name,age\nJohn,45\n", "patients.csv").unwrap();
        assert_eq!(text, "name  age\nJohn   45");
    }

    #[test]
    fn csv_pads_every_column_to_its_widest_cell() {
        let text = extract_text(
            b"test,value,unit\nhemoglobin,13.5,g/dL\nWBC,7,\n",
            "labs.csv",
        )
        .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "      test  value  unit");
        assert_eq!(lines[1], "hemoglobin   13.5  g/dL");
        assert_eq!(lines[2], "       WBC      7   NaN");
    }

    #[test]
    fn csv_short_rows_fill_with_nan_and_long_rows_fail() {
        let text = extract_text(b"a,b\n1\n", "short.csv").unwrap();
        assert_eq!(text, "a    b\n1  NaN");

        let error = extract_text(b"a,b\n1,2,3\n", "long.csv").unwrap_err();
        assert!(matches!(error, ExtractionError::Tabular(_)));
    }

    #[test]
    fn empty_csv_yields_empty_text() {
        assert_eq!(extract_text(b"", "empty.csv").unwrap(), "");
    }

    #[test]
    fn pdf_pages_are_concatenated_in_order() {
        let bytes = build_pdf(&["Blood pressure elevated", "Follow up in two weeks"]);
        let pages = extract_pdf_pages(&bytes).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("Blood pressure elevated"));
        assert!(pages[1].contains("Follow up in two weeks"));

        let text = extract_text(&bytes, "report.pdf").unwrap();
        assert_eq!(text, pages.concat());
        let first = text.find("Blood pressure").unwrap();
        let second = text.find("Follow up").unwrap();
        assert!(first < second);
    }

    #[test]
    fn pdf_page_without_text_contributes_nothing() {
        let bytes = build_pdf(&["First page", "", "Third page"]);
        let pages = extract_pdf_pages(&bytes).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages[1].trim().is_empty());
        let text = extract_text(&bytes, "scan.pdf").unwrap();
        assert!(text.contains("First page"));
        assert!(text.contains("Third page"));
    }

    #[test]
    fn malformed_pdf_is_an_error() {
        let error = extract_text(b"not a pdf", "fake.pdf").unwrap_err();
        assert!(matches!(error, ExtractionError::Pdf(_)));
    }

    #[test]
    fn extraction_is_deterministic() {
        let pdf = build_pdf(&["Stable output"]);
        let inputs: [(&[u8], &str); 3] = [
            (pdf.as_slice(), "a.pdf"),
            (b"plain words", "a.txt"),
            (b"x,y\n1,2\n", "a.csv"),
        ];
        for (bytes, name) in inputs {
            assert_eq!(
                extract_text(bytes, name).unwrap(),
                extract_text(bytes, name).unwrap()
            );
        }
    }

    #[test]
    fn document_extraction_uses_resolved_format() {
        let document = Document::new("notes.txt", b"Resting heart rate 62".to_vec());
        assert_eq!(extract_document(&document).unwrap(), "Resting heart rate 62");
    }
}
