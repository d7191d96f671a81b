// handlers/bootcamps/radius.rs - GET /bootcamps/radius/:zipcode/:distance

use axum::extract::{Path, State};

use crate::app::AppState;
use crate::database::memory::EARTH_RADIUS_MILES;
use crate::database::models::BOOTCAMPS;
use crate::database::store::Document;
use crate::error::{ApiError, AppResult};
use crate::middleware::ApiResponse;
use crate::services::bootcamps::locate;

/// Bootcamps within `distance` miles of the zipcode's center.
pub async fn within_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> AppResult<ApiResponse<Vec<Document>>> {
    let distance: f64 = distance
        .trim()
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::bad_request("Please provide a valid distance in miles"))?;

    let center = locate(state.geocoder.as_ref(), &zipcode).await?;
    let radius = distance / EARTH_RADIUS_MILES;

    let bootcamps = state
        .store
        .find_near(&BOOTCAMPS, center.longitude, center.latitude, radius)
        .await?
        .into_iter()
        .map(|doc| BOOTCAMPS.redact(doc))
        .collect();
    Ok(ApiResponse::list(bootcamps))
}
