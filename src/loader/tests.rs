use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn format_sniffing() {
    assert_eq!(
        DocumentFormat::from_path(Path::new("a.txt")).expect("txt is supported"),
        DocumentFormat::Text
    );
    assert_eq!(
        DocumentFormat::from_path(Path::new("a.md")).expect("md is supported"),
        DocumentFormat::Text
    );
    assert_eq!(
        DocumentFormat::from_path(Path::new("report.PDF")).expect("pdf is supported"),
        DocumentFormat::Pdf
    );
    assert_eq!(
        DocumentFormat::from_path(Path::new("memo.docx")).expect("docx is supported"),
        DocumentFormat::Docx
    );

    let err = DocumentFormat::from_path(Path::new("image.png")).expect_err("png is unsupported");
    assert!(matches!(err, crate::RagError::UnsupportedFormat(_)));
    assert!(err.is_recoverable());
}

#[test]
fn load_plain_text_file() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let path = temp_dir.path().join("note.txt");
    fs::write(&path, "hello from a text file").expect("can write file");

    let document = load_file(&path).expect("load succeeds");
    assert_eq!(document.format, DocumentFormat::Text);
    assert_eq!(document.text, "hello from a text file");
    assert_eq!(document.source_path, path.display().to_string());
}

#[test]
fn invalid_utf8_is_extraction_error() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let path = temp_dir.path().join("bad.txt");
    fs::write(&path, [0xff, 0xfe, 0x80]).expect("can write file");

    let err = load_file(&path).expect_err("invalid UTF-8 must fail");
    assert!(matches!(err, crate::RagError::Extraction { .. }));
}

#[test]
fn directory_load_skips_unsupported_files() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    fs::write(temp_dir.path().join("a.txt"), "first document").expect("can write");
    fs::write(temp_dir.path().join("b.txt"), "second document").expect("can write");
    fs::write(temp_dir.path().join("c.png"), [0u8; 4]).expect("can write");

    let outcome = load_path(temp_dir.path()).expect("directory load succeeds");
    assert_eq!(outcome.documents.len(), 2);
    assert_eq!(outcome.skipped.len(), 1);
    assert!(outcome.skipped[0].source_path.ends_with("c.png"));
}

#[test]
fn directory_load_recurses() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let nested = temp_dir.path().join("inner");
    fs::create_dir_all(&nested).expect("can create nested dir");
    fs::write(temp_dir.path().join("top.txt"), "top").expect("can write");
    fs::write(nested.join("deep.txt"), "deep").expect("can write");

    let outcome = load_path(temp_dir.path()).expect("directory load succeeds");
    assert_eq!(outcome.documents.len(), 2);
}

#[test]
fn corrupt_file_is_skipped_in_batch() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    fs::write(temp_dir.path().join("good.txt"), "fine").expect("can write");
    fs::write(temp_dir.path().join("broken.docx"), b"not a zip archive").expect("can write");

    let outcome = load_path(temp_dir.path()).expect("batch survives corrupt file");
    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert!(outcome.skipped[0].source_path.ends_with("broken.docx"));
}

#[test]
fn missing_path_is_an_error() {
    let err = load_path(Path::new("/nonexistent/definitely/missing"))
        .expect_err("missing path must fail");
    assert!(matches!(err, crate::RagError::Extraction { .. }));
}

#[test]
fn docx_extraction_reads_paragraph_text() {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let temp_dir = TempDir::new().expect("can create temp dir");
    let path = temp_dir.path().join("doc.docx");

    let document_xml = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        "<w:body>",
        "<w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>Second</w:t></w:r><w:r><w:tab/><w:t>column</w:t></w:r></w:p>",
        "</w:body></w:document>",
    );

    let file = fs::File::create(&path).expect("can create docx");
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("word/document.xml", SimpleFileOptions::default())
        .expect("can start zip entry");
    writer
        .write_all(document_xml.as_bytes())
        .expect("can write zip entry");
    writer.finish().expect("can finish zip");

    let document = load_file(&path).expect("docx load succeeds");
    assert_eq!(document.format, DocumentFormat::Docx);
    assert_eq!(document.text, "First paragraph.\nSecond\tcolumn\n");
}
