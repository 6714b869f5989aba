//! Media asset limits and header inspection.

use std::io::Cursor;

use crate::error::CoreError;
use crate::status::MediaKind;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Accepted photo content types.
pub const PHOTO_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Accepted video content types.
pub const VIDEO_MIME_TYPES: &[&str] = &["video/mp4", "video/quicktime", "video/webm"];

/// Largest photo accepted (10 MiB).
pub const MAX_PHOTO_BYTES: i64 = 10 * 1024 * 1024;

/// Largest video accepted (100 MiB).
pub const MAX_VIDEO_BYTES: i64 = 100 * 1024 * 1024;

/// Most assets a single memorial may hold.
pub const MAX_ASSETS_PER_MEMORIAL: i64 = 200;

/// Maximum caption length.
pub const MAX_CAPTION_LENGTH: usize = 500;

/* --------------------------------------------------------------------------
Validation
-------------------------------------------------------------------------- */

/// Resolve the media kind of a content type, rejecting unsupported ones.
pub fn kind_for_mime(mime_type: &str) -> Result<MediaKind, CoreError> {
    let mime = mime_type.trim().to_ascii_lowercase();
    if PHOTO_MIME_TYPES.contains(&mime.as_str()) {
        Ok(MediaKind::Photo)
    } else if VIDEO_MIME_TYPES.contains(&mime.as_str()) {
        Ok(MediaKind::Video)
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported media type '{mime_type}'"
        )))
    }
}

/// Size ceiling for a media kind.
pub fn max_bytes(kind: MediaKind) -> i64 {
    match kind {
        MediaKind::Photo => MAX_PHOTO_BYTES,
        MediaKind::Video => MAX_VIDEO_BYTES,
    }
}

/// Validate a content type and size together, returning the kind.
pub fn validate_upload(mime_type: &str, bytes: i64) -> Result<MediaKind, CoreError> {
    let kind = kind_for_mime(mime_type)?;
    if bytes <= 0 {
        return Err(CoreError::Validation("File is empty".to_string()));
    }
    let max = max_bytes(kind);
    if bytes > max {
        return Err(CoreError::Validation(format!(
            "{kind} exceeds the maximum size of {} MiB",
            max / (1024 * 1024)
        )));
    }
    Ok(kind)
}

/// Reject a new asset once the memorial is at capacity.
pub fn validate_asset_count(existing: i64) -> Result<(), CoreError> {
    if existing >= MAX_ASSETS_PER_MEMORIAL {
        return Err(CoreError::Validation(format!(
            "A memorial can hold at most {MAX_ASSETS_PER_MEMORIAL} media assets"
        )));
    }
    Ok(())
}

pub fn validate_caption(caption: Option<&str>) -> Result<(), CoreError> {
    match caption {
        Some(c) if c.chars().count() > MAX_CAPTION_LENGTH => Err(CoreError::Validation(format!(
            "caption exceeds maximum length of {MAX_CAPTION_LENGTH} characters"
        ))),
        _ => Ok(()),
    }
}

/// Read photo dimensions from the file header without decoding pixels.
///
/// Returns `None` when the header cannot be parsed; the upload is still
/// accepted in that case, just without dimensions.
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
