#[cfg(test)]
mod tests;

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::{RagError, Result};

/// A source file with its extracted plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub source_path: String,
    pub format: DocumentFormat,
    pub text: String,
}

/// Supported source document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Pdf,
    Docx,
}

impl fmt::Display for DocumentFormat {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DocumentFormat::Text => write!(f, "text"),
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Docx => write!(f, "docx"),
        }
    }
}

impl DocumentFormat {
    /// Sniff the format from a file extension.
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "txt" | "md" => Ok(DocumentFormat::Text),
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            _ => Err(RagError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// A document that could not be loaded, with the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub source_path: String,
    pub reason: String,
}

/// Result of loading a file or directory: the documents that extracted
/// cleanly plus the files that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedDocument>,
}

/// Load a single file, extracting its plain text.
#[inline]
pub fn load_file(path: &Path) -> Result<Document> {
    let format = DocumentFormat::from_path(path)?;
    debug!("Loading {} document: {}", format, path.display());

    let text = match format {
        DocumentFormat::Text => extract_text(path)?,
        DocumentFormat::Pdf => extract_pdf(path)?,
        DocumentFormat::Docx => extract_docx(path)?,
    };

    Ok(Document {
        id: Uuid::new_v4().to_string(),
        source_path: path.display().to_string(),
        format,
        text,
    })
}

/// Load a file or recurse into a directory.
///
/// Unsupported and unreadable files are skipped and logged rather than
/// failing the batch; the outcome records every skip with its reason.
#[inline]
pub fn load_path(path: &Path) -> Result<LoadOutcome> {
    if !path.exists() {
        return Err(RagError::Extraction {
            path: path.display().to_string(),
            reason: "path does not exist".to_string(),
        });
    }

    if path.is_file() {
        return Ok(match load_file(path) {
            Ok(document) => LoadOutcome {
                documents: vec![document],
                skipped: Vec::new(),
            },
            Err(e) if e.is_recoverable() => {
                warn!("Skipping {}: {}", path.display(), e);
                LoadOutcome {
                    documents: Vec::new(),
                    skipped: vec![SkippedDocument {
                        source_path: path.display().to_string(),
                        reason: e.to_string(),
                    }],
                }
            }
            Err(e) => return Err(e),
        });
    }

    let mut outcome = LoadOutcome::default();
    for entry in WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        match load_file(entry.path()) {
            Ok(document) => outcome.documents.push(document),
            Err(e) if e.is_recoverable() => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                outcome.skipped.push(SkippedDocument {
                    source_path: entry.path().display().to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        "Loaded {} documents from {} ({} skipped)",
        outcome.documents.len(),
        path.display(),
        outcome.skipped.len()
    );

    Ok(outcome)
}

fn extract_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| RagError::Extraction {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    String::from_utf8(bytes).map_err(|_| RagError::Extraction {
        path: path.display().to_string(),
        reason: "file is not valid UTF-8".to_string(),
    })
}

fn extract_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path).map_err(|e| RagError::Extraction {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Extract text from a .docx file by reading `word/document.xml` out of the
/// zip container. Paragraph ends become newlines; tabs become tabs.
fn extract_docx(path: &Path) -> Result<String> {
    let extraction_error = |reason: String| RagError::Extraction {
        path: path.display().to_string(),
        reason,
    };

    let file = fs::File::open(path).map_err(|e| extraction_error(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| extraction_error(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| extraction_error(format!("missing word/document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| extraction_error(e.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                let fragment = t
                    .unescape()
                    .map_err(|e| extraction_error(e.to_string()))?;
                text.push_str(&fragment);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:tab" => text.push('\t'),
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:br" => text.push('\n'),
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => text.push('\n'),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(extraction_error(e.to_string())),
        }
    }

    Ok(text)
}
