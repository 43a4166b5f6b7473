use std::io::{Cursor, Read};

use quick_xml::{Reader, events::Event};
use tokio::task;
use zip::ZipArchive;

use crate::analysis::AnalysisInput;
use crate::llm::ImageInput;

mod hwp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
    Hwp,
    Image { media_type: String },
}

impl DocumentFormat {
    /// Decides the format from the upload's file name, then its declared MIME type.
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Option<Self> {
        let extension = std::path::Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        let content_type = content_type
            .map(|raw| raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|raw| !raw.is_empty());

        match extension.as_deref() {
            Some("pdf") => return Some(Self::Pdf),
            Some("docx") => return Some(Self::Docx),
            Some("txt" | "md") => return Some(Self::Text),
            Some("hwp") => return Some(Self::Hwp),
            Some(ext) => {
                if let Some(media_type) = image_media_type(ext) {
                    return Some(Self::Image {
                        media_type: media_type.to_string(),
                    });
                }
            }
            None => {}
        }

        match content_type.as_deref() {
            Some("application/pdf") => Some(Self::Pdf),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document") => {
                Some(Self::Docx)
            }
            Some("text/plain" | "text/markdown") => Some(Self::Text),
            Some("application/x-hwp" | "application/haansofthwp") => Some(Self::Hwp),
            Some(mime) if mime.starts_with("image/") => Some(Self::Image {
                media_type: mime.to_string(),
            }),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Text => "txt",
            Self::Hwp => "hwp",
            Self::Image { .. } => "image",
        }
    }
}

fn image_media_type(extension: &str) -> Option<&'static str> {
    match extension {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported file format")]
    Unsupported,

    #[error("failed to read {format} document: {detail}")]
    Unreadable {
        format: &'static str,
        detail: String,
    },

    #[error("PDF has no text layer")]
    ScannedPdf,

    #[error("document contains too little text ({chars} chars)")]
    Empty { chars: usize },
}

/// Turns an uploaded file into engine input, rejecting documents with too little text.
pub async fn prepare_input(
    format: DocumentFormat,
    bytes: Vec<u8>,
    min_chars: usize,
) -> Result<AnalysisInput, ExtractError> {
    if let DocumentFormat::Image { media_type } = format {
        return Ok(AnalysisInput::Image(ImageInput::new(bytes, media_type)));
    }

    let text = extract_text(&format, bytes).await?;
    let content = text.trim().to_string();
    let chars = content.chars().count();

    if chars <= min_chars {
        return Err(match format {
            DocumentFormat::Pdf => ExtractError::ScannedPdf,
            _ => ExtractError::Empty { chars },
        });
    }

    Ok(AnalysisInput::Text { content })
}

pub async fn extract_text(format: &DocumentFormat, bytes: Vec<u8>) -> Result<String, ExtractError> {
    let label = format.label();
    let unreadable = move |detail: String| ExtractError::Unreadable {
        format: label,
        detail,
    };

    match format {
        DocumentFormat::Text => Ok(decode_plain_text(&bytes)),
        DocumentFormat::Pdf => task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|error| unreadable(format!("join error: {}", error)))?
            .map_err(|error| unreadable(error.to_string())),
        DocumentFormat::Docx => task::spawn_blocking(move || extract_docx_text(&bytes))
            .await
            .map_err(|error| unreadable(format!("join error: {}", error)))?
            .map_err(|error| unreadable(format!("{:#}", error))),
        DocumentFormat::Hwp => task::spawn_blocking(move || hwp::extract_hwp_text(&bytes))
            .await
            .map_err(|error| unreadable(format!("join error: {}", error)))?
            .map_err(unreadable),
        DocumentFormat::Image { .. } => Err(ExtractError::Unsupported),
    }
}

fn decode_plain_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn extract_docx_text(bytes: &[u8]) -> Result<String, anyhow::Error> {
    use anyhow::{Context, anyhow};

    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("Invalid DOCX zip structure")?;
    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("Missing word/document.xml in DOCX")?
        .read_to_string(&mut document_xml)
        .context("Failed to read DOCX XML")?;

    let mut reader = Reader::from_reader(Cursor::new(document_xml.into_bytes()));

    let mut text = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(event)) if event.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(event)) => match event.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(event)) if event.name().as_ref() == b"w:tab" => text.push('\t'),
            Ok(Event::Text(event)) if in_text_run => {
                let decoded = event
                    .unescape()
                    .context("Failed to decode DOCX text node")?;
                text.push_str(&decoded);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(anyhow!("Failed to parse DOCX XML: {}", error)),
        }
        buf.clear();
    }

    Ok(text)
}
