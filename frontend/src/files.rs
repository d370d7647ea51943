use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use js_sys::Uint8Array;
use wasm_bindgen_futures::JsFuture;

use crate::models::Attachment;

/// Files above this size are rejected at selection time. The backend enforces
/// the same limit.
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Image types the tutor backend accepts as inline model input.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Document extensions the backend text extractor understands.
pub const ALLOWED_DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "docx", "xlsx", "xls", "txt", "md"];

#[derive(Clone, Debug, PartialEq)]
pub enum FileError {
    TooLarge { size: usize },
    Unsupported { detail: String },
    Read { detail: String },
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileError::TooLarge { size } => write!(
                f,
                "File is too large ({size} bytes); the limit is {MAX_FILE_BYTES} bytes"
            ),
            FileError::Unsupported { detail } => write!(f, "Unsupported file type: {detail}"),
            FileError::Read { detail } => write!(f, "Could not read file: {detail}"),
        }
    }
}

fn extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

fn is_acceptable(name: &str, mime_type: &str) -> bool {
    if mime_type.starts_with("image/") {
        return ALLOWED_IMAGE_TYPES.contains(&mime_type);
    }
    ALLOWED_DOCUMENT_EXTENSIONS.contains(&extension(name).as_str())
}

/// Validates and base64-encodes a selected file. Pure apart from the caller
/// supplying the bytes, so the rejection rules are unit-testable.
pub fn encode_attachment(name: &str, mime_type: &str, bytes: &[u8]) -> Result<Attachment, FileError> {
    if !is_acceptable(name, mime_type) {
        return Err(FileError::Unsupported {
            detail: if mime_type.is_empty() { name.to_string() } else { mime_type.to_string() },
        });
    }
    if bytes.len() > MAX_FILE_BYTES {
        return Err(FileError::TooLarge { size: bytes.len() });
    }

    Ok(Attachment {
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        encoded_data: BASE64.encode(bytes),
    })
}

/// Reads a selected browser file and encodes it. The UI shows a transient
/// "processing" state while this future is pending.
pub async fn read_and_encode(file: &web_sys::File) -> Result<Attachment, FileError> {
    // Size check first so an oversized file is rejected without a full read.
    if file.size() as usize > MAX_FILE_BYTES {
        return Err(FileError::TooLarge { size: file.size() as usize });
    }

    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| FileError::Read { detail: format!("{e:?}") })?;
    let bytes = Uint8Array::new(&buffer).to_vec();

    encode_attachment(&file.name(), &file.type_(), &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_allowed_images() {
        let att = encode_attachment("sketch.png", "image/png", b"fake png bytes").unwrap();
        assert_eq!(att.mime_type, "image/png");
        assert_eq!(BASE64.decode(&att.encoded_data).unwrap(), b"fake png bytes");
    }

    #[test]
    fn decoded_payload_matches_original_size() {
        let bytes = vec![7u8; 4321];
        let att = encode_attachment("photo.webp", "image/webp", &bytes).unwrap();
        assert_eq!(BASE64.decode(&att.encoded_data).unwrap().len(), bytes.len());
    }

    #[test]
    fn rejects_disallowed_image_types() {
        let err = encode_attachment("anim.gif", "image/gif", b"gif").unwrap_err();
        assert!(matches!(err, FileError::Unsupported { .. }));
    }

    #[test]
    fn accepts_known_document_extensions() {
        assert!(encode_attachment("notes.pdf", "application/pdf", b"%PDF").is_ok());
        assert!(encode_attachment("sheet.xlsx", "", b"PK").is_ok());
    }

    #[test]
    fn rejects_unknown_documents() {
        let err = encode_attachment("tool.exe", "application/x-msdownload", b"MZ").unwrap_err();
        assert!(matches!(err, FileError::Unsupported { .. }));
    }

    #[test]
    fn rejects_files_over_the_limit() {
        let bytes = vec![0u8; MAX_FILE_BYTES + 1];
        let err = encode_attachment("big.png", "image/png", &bytes).unwrap_err();
        assert_eq!(err, FileError::TooLarge { size: MAX_FILE_BYTES + 1 });
    }
}
