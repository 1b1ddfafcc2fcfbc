use crate::api::error::AppError;
use mime::Mime;

pub const THUMBNAIL_TYPES: &[&str] = &["image/jpeg", "image/png"];
pub const VIDEO_TYPES: &[&str] = &["video/mp4"];

/// One in-flight upload: the body stream plus what the client declared about
/// it. The filename is advisory only and never used for storage paths.
pub struct UploadedMedia<R> {
    pub reader: R,
    pub content_type: Mime,
    pub filename: Option<String>,
}

impl<R> UploadedMedia<R> {
    pub fn new(reader: R, content_type: Mime, filename: Option<String>) -> Self {
        Self {
            reader,
            content_type,
            filename,
        }
    }
}

/// Check a declared Content-Type against an allow-list. Runs before any file
/// is created.
pub fn validate_declared_type(raw: Option<&str>, accepted: &[&str]) -> Result<Mime, AppError> {
    let raw = raw.ok_or_else(|| AppError::BadRequest("Missing Content-Type for upload".to_string()))?;

    let mime: Mime = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Malformed Content-Type '{}'", raw)))?;

    if !accepted.contains(&mime.essence_str()) {
        return Err(AppError::UnsupportedMediaType(format!(
            "'{}' is not allowed, expected one of: {}",
            mime.essence_str(),
            accepted.join(", ")
        )));
    }

    Ok(mime)
}
