//! Shared fixtures: minimal generated PDF documents
//!
//! Tests build their documents on the fly instead of shipping binary
//! fixtures. The generated files carry a correct xref table so they parse
//! without repair.

use std::io;
use std::path::Path;

/// Write a minimal `page_count`-page PDF to `path`.
pub fn write_pdf(path: &Path, page_count: usize) -> io::Result<()> {
    std::fs::write(path, pdf_bytes(page_count))
}

/// Assemble the document: one catalog, one page tree, `page_count` empty
/// US-letter pages, xref offsets computed from the actual byte positions.
#[must_use]
pub fn pdf_bytes(page_count: usize) -> Vec<u8> {
    let kids: Vec<String> = (0..page_count)
        .map(|index| format!("{} 0 R", 3 + index))
        .collect();

    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        ),
    ];
    for _ in 0..page_count {
        objects.push("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_string());
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{body}\nendobj\n", index + 1));
    }

    let xref_offset = out.len();
    out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    out.push_str("0000000000 65535 f \n");
    for offset in offsets {
        out.push_str(&format!("{offset:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    ));

    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_document_has_consistent_structure() {
        let bytes = pdf_bytes(2);
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/Count 2"));
        assert_eq!(text.matches("/Type /Page ").count(), 2);
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let text = String::from_utf8(pdf_bytes(1)).unwrap();

        for index in 1..=3 {
            let marker = format!("{index} 0 obj");
            let actual = text.find(&marker).unwrap();
            let encoded = format!("{actual:010} 00000 n ");
            assert!(text.contains(&encoded), "offset of object {index} is wrong");
        }
    }
}
