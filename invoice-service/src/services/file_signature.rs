//! Logo upload validation: size ceiling, declared-type allow list, and
//! magic-number sniffing of the actual bytes. The declared type alone is
//! never trusted; the sniffed signature must agree with it.

use service_core::error::AppError;

pub const MAX_LOGO_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

pub const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    fn matches_declared(&self, declared: &str) -> bool {
        match self {
            ImageKind::Jpeg => declared == "image/jpeg" || declared == "image/jpg",
            ImageKind::Png => declared == "image/png",
        }
    }
}

/// Classify a buffer by its leading bytes.
pub fn sniff(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xD8 {
        return Some(ImageKind::Jpeg);
    }
    if bytes.len() >= 4 && bytes[..4] == [0x89, 0x50, 0x4E, 0x47] {
        return Some(ImageKind::Png);
    }
    None
}

#[derive(Debug, Clone, Copy)]
pub struct ValidatedFile {
    pub resolved_type: &'static str,
    pub size: usize,
}

pub fn validate(bytes: &[u8], declared_mime_type: &str) -> Result<ValidatedFile, AppError> {
    if bytes.len() > MAX_LOGO_UPLOAD_BYTES {
        return Err(AppError::field_validation(
            "file",
            "File size exceeds maximum allowed (2MB)",
        ));
    }

    let declared = declared_mime_type.to_ascii_lowercase();
    if !ACCEPTED_IMAGE_TYPES.contains(&declared.as_str()) {
        return Err(AppError::field_validation(
            "file",
            "Invalid file type. Only JPG, JPEG & PNG files are allowed",
        ));
    }

    let Some(kind) = sniff(bytes) else {
        return Err(AppError::field_validation(
            "file",
            "File content does not match an accepted image format",
        ));
    };

    if !kind.matches_declared(&declared) {
        return Err(AppError::field_validation(
            "file",
            "File content does not match the declared file type",
        ));
    }

    Ok(ValidatedFile {
        resolved_type: kind.mime_type(),
        size: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEADER: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];
    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn jpeg_bytes_with_jpeg_declaration_validate() {
        let validated = validate(&JPEG_HEADER, "image/jpeg").expect("valid jpeg");
        assert_eq!(validated.resolved_type, "image/jpeg");
        assert_eq!(validated.size, 4);

        // The jpg alias declares the same signature.
        assert!(validate(&JPEG_HEADER, "image/jpg").is_ok());
    }

    #[test]
    fn png_bytes_with_png_declaration_validate() {
        let validated = validate(&PNG_HEADER, "image/png").expect("valid png");
        assert_eq!(validated.resolved_type, "image/png");
    }

    #[test]
    fn signature_and_declaration_mismatch_is_rejected() {
        // PNG signature declared as JPEG: both individually accepted, but
        // they contradict each other.
        assert!(validate(&PNG_HEADER, "image/jpeg").is_err());
        assert!(validate(&JPEG_HEADER, "image/png").is_err());
    }

    #[test]
    fn unrecognized_signature_is_rejected() {
        assert!(validate(b"GIF89a......", "image/png").is_err());
        assert!(validate(&[], "image/png").is_err());
    }

    #[test]
    fn declared_type_outside_the_allow_list_is_rejected() {
        assert!(validate(&JPEG_HEADER, "image/gif").is_err());
        assert!(validate(&JPEG_HEADER, "application/pdf").is_err());
    }

    #[test]
    fn oversized_buffer_is_rejected() {
        let mut bytes = vec![0u8; MAX_LOGO_UPLOAD_BYTES + 1];
        bytes[..2].copy_from_slice(&[0xFF, 0xD8]);
        assert!(validate(&bytes, "image/jpeg").is_err());
    }
}
