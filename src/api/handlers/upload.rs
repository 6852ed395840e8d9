use crate::AppState;
use crate::api::error::AppError;
use crate::services::uploader::UploadRequest;
use axum::extract::multipart::{Field, Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use bytes::{Bytes, BytesMut};
use serde::Deserialize;
use utoipa::ToSchema;

/// Multipart form accepted by `POST /upload`.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub bucket_name: String,
    pub region: String,
    pub file_name: String,
}

#[derive(Default)]
struct ParsedForm {
    file: Option<(Bytes, Option<String>)>,
    bucket_name: String,
    region: String,
    file_name: String,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored in the bucket", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed body or missing field"),
        (status = 405, description = "Method other than POST"),
        (status = 500, description = "Storage configuration or write failure")
    ),
    tag = "upload"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<String, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected upload body: {}", e);
        AppError::BadRequest("Unable to parse form data".to_string())
    })?;

    let form = parse_form(&mut multipart, state.config.max_upload_size).await?;

    let (body, content_type) = form
        .file
        .ok_or_else(|| AppError::BadRequest("Unable to retrieve the file".to_string()))?;
    let bucket = required(form.bucket_name, "Bucket name is required")?;
    let region = required(form.region, "Region is required")?;
    let key = required(form.file_name, "File name is required")?;

    let outcome = state
        .uploader
        .upload(UploadRequest {
            bucket,
            key,
            region,
            content_type,
            body,
        })
        .await?;

    Ok(format!(
        "File uploaded successfully to S3 bucket {} in region {}",
        outcome.bucket, outcome.region
    ))
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Collects the form fields in any order. The file part is buffered in memory,
/// bounded by `max_file_size`: PutObject needs a known content length, and the
/// text fields naming the destination may arrive after the file.
async fn parse_form(
    multipart: &mut Multipart,
    max_file_size: usize,
) -> Result<ParsedForm, AppError> {
    let mut form = ParsedForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let body = read_file_part(&mut field, max_file_size).await?;
                form.file = Some((body, content_type));
            }
            "bucketName" => form.bucket_name = field.text().await.map_err(malformed)?,
            "region" => form.region = field.text().await.map_err(malformed)?,
            "fileName" => form.file_name = field.text().await.map_err(malformed)?,
            _ => {}
        }
    }

    Ok(form)
}

async fn read_file_part(field: &mut Field<'_>, limit: usize) -> Result<Bytes, AppError> {
    let mut buf = BytesMut::new();

    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        if buf.len() + chunk.len() > limit {
            return Err(AppError::BadRequest(format!(
                "File exceeds the maximum upload size of {} bytes",
                limit
            )));
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

/// Rejects blank values; accepted values are passed on exactly as submitted.
fn required(value: String, message: &str) -> Result<String, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(message.to_string()));
    }
    Ok(value)
}

fn malformed(err: MultipartError) -> AppError {
    tracing::debug!("Malformed multipart body: {}", err);
    AppError::BadRequest(format!("Unable to parse form data: {}", err.body_text()))
}
