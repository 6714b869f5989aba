//! Cloudinary-compatible upload client.
//!
//! Requests are signed by sorting the signed parameters, joining them as
//! `k=v&k=v`, appending the API secret and taking the SHA-256 hex digest.
//! The account must be configured for SHA-256 signatures.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gather_core::hashing::sha256_hex;
use gather_core::status::MediaKind;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{resource_type, MediaProvider, SignedUpload, UploadRequest, UploadedMedia};
use crate::error::ProviderError;
use crate::http::parse_response;

const PROVIDER: &str = "cloudinary";

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
}

impl CloudinaryConfig {
    /// Load from `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`,
    /// `CLOUDINARY_API_SECRET` and optionally `CLOUDINARY_API_BASE`.
    ///
    /// Returns `None` unless all three credentials are set.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME").ok()?,
            api_key: std::env::var("CLOUDINARY_API_KEY").ok()?,
            api_secret: std::env::var("CLOUDINARY_API_SECRET").ok()?,
            api_base: std::env::var("CLOUDINARY_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        })
    }
}

/// Sign a parameter set with the API secret.
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    sha256_hex(format!("{joined}{api_secret}").as_bytes())
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct CloudinaryClient {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, kind: MediaKind, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{action}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            resource_type(kind)
        )
    }
}

#[async_trait]
impl MediaProvider for CloudinaryClient {
    fn sign_upload(&self, kind: MediaKind, folder: &str, timestamp: i64) -> SignedUpload {
        let params = BTreeMap::from([
            ("folder", folder.to_string()),
            ("timestamp", timestamp.to_string()),
        ]);
        SignedUpload {
            upload_url: self.endpoint(kind, "upload"),
            api_key: self.config.api_key.clone(),
            cloud_name: self.config.cloud_name.clone(),
            folder: folder.to_string(),
            timestamp,
            signature: sign_params(&params, &self.config.api_secret),
        }
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadedMedia, ProviderError> {
        let timestamp = chrono::Utc::now().timestamp();
        let signed = self.sign_upload(request.kind, &request.folder, timestamp);

        let file = Part::bytes(request.data)
            .file_name(request.file_name)
            .mime_str(&request.mime_type)?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", signed.api_key)
            .text("folder", signed.folder)
            .text("timestamp", timestamp.to_string())
            .text("signature", signed.signature);

        let response = self
            .client
            .post(signed.upload_url)
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadedMedia = parse_response(PROVIDER, response).await?;
        tracing::info!(public_id = %uploaded.public_id, bytes = uploaded.bytes, "Media uploaded");
        Ok(uploaded)
    }

    async fn destroy(&self, public_id: &str, kind: MediaKind) -> Result<(), ProviderError> {
        let timestamp = chrono::Utc::now().timestamp();
        let params = BTreeMap::from([
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp.to_string()),
        ]);
        let signature = sign_params(&params, &self.config.api_secret);

        let response = self
            .client
            .post(self.endpoint(kind, "destroy"))
            .form(&[
                ("public_id", public_id.to_string()),
                ("timestamp", timestamp.to_string()),
                ("api_key", self.config.api_key.clone()),
                ("signature", signature),
            ])
            .send()
            .await?;
        let body: DestroyResponse = parse_response(PROVIDER, response).await?;
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: format!("destroy of {public_id} returned '{other}'"),
            }),
        }
    }
}
