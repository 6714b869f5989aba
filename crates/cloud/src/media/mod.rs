//! Media CDN uploads.

pub mod cloudinary;

use async_trait::async_trait;
use gather_core::status::MediaKind;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Parameters a client needs to upload straight to the CDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUpload {
    pub upload_url: String,
    pub api_key: String,
    pub cloud_name: String,
    pub folder: String,
    pub timestamp: i64,
    pub signature: String,
}

/// A file passed through the API to the CDN.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub kind: MediaKind,
    pub folder: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// What the CDN reports about a stored asset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedMedia {
    pub public_id: String,
    pub secure_url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bytes: i64,
    /// Seconds, videos only.
    pub duration: Option<f64>,
}

/// Resource type segment used in CDN URLs.
pub fn resource_type(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Photo => "image",
        MediaKind::Video => "video",
    }
}

/// Poster frame URL for a video: same path with a `.jpg` extension.
pub fn video_thumbnail_url(video_url: &str) -> String {
    let (stem, _) = match video_url.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => (stem, ext),
        _ => (video_url, ""),
    };
    format!("{stem}.jpg")
}

#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Sign a direct client upload into `folder` at `timestamp` (Unix seconds).
    fn sign_upload(&self, kind: MediaKind, folder: &str, timestamp: i64) -> SignedUpload;

    /// Upload a file on the client's behalf.
    async fn upload(&self, request: UploadRequest) -> Result<UploadedMedia, ProviderError>;

    /// Remove an asset. Deleting an asset that is already gone succeeds.
    async fn destroy(&self, public_id: &str, kind: MediaKind) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_thumbnails_swap_extension() {
        assert_eq!(
            video_thumbnail_url("https://cdn.example/v1/memorials/clip.mp4"),
            "https://cdn.example/v1/memorials/clip.jpg"
        );
        assert_eq!(
            video_thumbnail_url("https://cdn.example/v1/memorials/clip"),
            "https://cdn.example/v1/memorials/clip.jpg"
        );
    }

    #[test]
    fn resource_types() {
        assert_eq!(resource_type(MediaKind::Photo), "image");
        assert_eq!(resource_type(MediaKind::Video), "video");
    }
}
