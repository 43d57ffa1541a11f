//! Image uploads, forwarded to an external object store.

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::{
    config::CloudinaryConfig,
    error::{AppError, AppResult},
};

pub const USER_IMAGE_FOLDER: &str = "scentara/users";
pub const PRODUCT_IMAGE_FOLDER: &str = "scentara/products";

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the image and returns its public URL.
    async fn upload(&self, folder: &str, image: ImageUpload) -> AppResult<String>;
}

/// Accepts jpg, jpeg and png. A declared content type decides on its own; the
/// file extension only counts when the part carries no content type.
pub fn validate_image(file_name: Option<&str>, content_type: Option<&str>) -> AppResult<&'static str> {
    let detected = match content_type {
        Some(declared) => match declared.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some("image/jpeg"),
            "image/png" => Some("image/png"),
            _ => None,
        },
        None => file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .and_then(|ext| match ext.as_str() {
                "jpg" | "jpeg" => Some("image/jpeg"),
                "png" => Some("image/png"),
                _ => None,
            }),
    };

    detected.ok_or_else(|| AppError::BadRequest("Only jpg, jpeg and png images are allowed".into()))
}

pub struct CloudinaryStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        )
    }
}

/// Signed-upload signature: SHA-1 over the alphabetically sorted params
/// followed by the API secret.
pub fn sign_upload(folder: &str, timestamp: i64, api_secret: &str) -> String {
    let payload = format!("folder={folder}&timestamp={timestamp}{api_secret}");
    hex::encode(Sha1::digest(payload.as_bytes()))
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, folder: &str, image: ImageUpload) -> AppResult<String> {
        let timestamp = Utc::now().timestamp();
        let signature = sign_upload(folder, timestamp, &self.config.api_secret);

        let file = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name)
            .mime_str(&image.content_type)
            .map_err(|e| AppError::Upload(e.to_string()))?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", folder.to_string())
            .text("signature", signature);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("object store request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!("object store returned {status}: {body}")));
        }

        let uploaded: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("unexpected object store response: {e}")))?;
        tracing::debug!(url = %uploaded.secure_url, folder, "image uploaded");
        Ok(uploaded.secure_url)
    }
}

/// Used when no object store is configured.
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _folder: &str, _image: ImageUpload) -> AppResult<String> {
        Err(AppError::Upload("image uploads are not configured".into()))
    }
}
