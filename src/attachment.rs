use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;

use crate::errors::AppError;
use crate::models::Attachment;

/// Attachments above this size are rejected before anything is sent upstream.
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Image types the model API accepts as inline parts (strict set).
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Document types the text extractor knows how to handle.
pub const ALLOWED_DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "text/plain",
    "text/markdown",
];

static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/(png|jpeg|jpg|webp);base64,(.+)$").expect("valid data URL regex")
});

/// An image data URL split into its MIME type and base64 payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: String,
}

impl DataUrl {
    /// Parses `data:image/(png|jpeg|jpg|webp);base64,<data>`. Anything else
    /// yields `None`; callers decide whether that is an error or a drop.
    pub fn parse(input: &str) -> Option<DataUrl> {
        let caps = DATA_URL_RE.captures(input)?;
        let subtype = match &caps[1] {
            "jpg" => "jpeg",
            other => other,
        };
        Some(DataUrl {
            mime_type: format!("image/{subtype}"),
            data: caps[2].to_string(),
        })
    }
}

/// Validates an incoming attachment's type and decoded size. The client runs
/// the same checks before upload; this is the server-side backstop.
pub fn validate(attachment: &Attachment) -> Result<(), AppError> {
    let mime = attachment.mime_type.as_str();
    if !ALLOWED_IMAGE_TYPES.contains(&mime) && !ALLOWED_DOCUMENT_TYPES.contains(&mime) {
        return Err(AppError::UnsupportedType { mime_type: mime.to_string() });
    }

    let size = decoded_len(&attachment.encoded_data);
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AppError::FileTooLarge {
            name: attachment.name.clone(),
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}

pub fn decode(attachment: &Attachment) -> Result<Vec<u8>, AppError> {
    BASE64
        .decode(attachment.encoded_data.as_bytes())
        .map_err(|e| AppError::FileReadError { message: format!("invalid base64 payload: {e}") })
}

/// Decoded size of a base64 payload without allocating the output.
fn decoded_len(encoded: &str) -> usize {
    let padding = encoded.bytes().rev().take_while(|&b| b == b'=').count();
    (encoded.len() / 4 * 3).saturating_sub(padding)
}
