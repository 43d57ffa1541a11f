use axum::extract::Multipart;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    services::upload_service::{ImageUpload, validate_image},
};

pub const IMAGE_FIELD: &str = "image";

/// Form layout of the image upload endpoints, for the API docs.
#[derive(ToSchema)]
pub struct ImageForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Pulls the `image` part out of a multipart body; other parts are ignored.
pub async fn image_field(mut multipart: Multipart) -> AppResult<ImageUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let content_type = validate_image(Some(&file_name), content_type.as_deref())?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if bytes.is_empty() {
            break;
        }

        return Ok(ImageUpload {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        });
    }

    Err(AppError::BadRequest("No image uploaded".into()))
}
