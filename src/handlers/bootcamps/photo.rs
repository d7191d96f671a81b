// handlers/bootcamps/photo.rs - PUT /bootcamps/:id/photo

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use serde_json::Value;

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::BOOTCAMPS;
use crate::database::store::Document;
use crate::error::{ApiError, AppResult};
use crate::handlers::load;
use crate::middleware::{authorize, ensure_owner, ApiResponse};

use super::{not_found, PUBLISHERS};

/// `.ext` of the uploaded name, or nothing.
fn extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Store the multipart `file` field as `photo_{id}{ext}` and point the bootcamp at it.
pub async fn upload_photo(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<ApiResponse<String>> {
    authorize(&principal, &PUBLISHERS)?;
    let bootcamp = load(state.store.as_ref(), &BOOTCAMPS, &id, || not_found(&id)).await?;
    ensure_owner(&principal, bootcamp.get("user"), &format!("update bootcamp {}", id))?;

    let mut multipart = multipart.map_err(|_| ApiError::bad_request("Please upload a file"))?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let ext = extension(field.file_name());
            let bytes = field.bytes().await?;
            upload = Some((content_type, ext, bytes));
            break;
        }
    }

    let Some((content_type, ext, bytes)) = upload else {
        return Err(ApiError::bad_request("Please upload a file").into());
    };
    if !content_type.starts_with("image") {
        return Err(ApiError::bad_request("Please upload an image file").into());
    }
    let max = state.config.uploads.max_file_upload;
    if bytes.len() > max {
        return Err(ApiError::bad_request(format!("Please upload an image less than {}", max)).into());
    }

    let file_name = format!("photo_{}{}", id, ext);
    let dir = &state.config.uploads.file_upload_path;
    let written = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(&file_name), &bytes).await
    }
    .await;
    if let Err(e) = written {
        tracing::error!(path = %dir.display(), "photo upload failed: {}", e);
        return Err(ApiError::internal_server_error("Problem with file upload").into());
    }

    let mut changes = Document::new();
    changes.insert("photo".into(), Value::String(file_name.clone()));
    state.store.update(&BOOTCAMPS, &id, changes).await?;

    Ok(ApiResponse::success(file_name))
}

#[cfg(test)]
mod tests {
    use super::extension;

    #[test]
    fn keeps_the_original_extension() {
        assert_eq!(extension(Some("campus.jpg")), ".jpg");
        assert_eq!(extension(Some("archive.tar.gz")), ".gz");
        assert_eq!(extension(Some("README")), "");
        assert_eq!(extension(None), "");
    }
}
