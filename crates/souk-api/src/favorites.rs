use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use souk_types::api::{Claims, ListingResponse};

use crate::auth::AppState;
use crate::listings::listing_response;

/// Idempotent add: the unique (user, listing) constraint absorbs repeats,
/// so two rapid taps can never leave duplicate rows.
pub async fn add_favorite(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    state
        .db
        .get_listing(&listing_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let favorite_id = Uuid::new_v4();
    let added = state
        .db
        .add_favorite(
            &favorite_id.to_string(),
            &claims.sub.to_string(),
            &listing_id.to_string(),
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(serde_json::json!({ "added": added })))
}

/// Removes every matching pair, tolerating duplicates from older data.
pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let removed = state
        .db
        .remove_favorite(&claims.sub.to_string(), &listing_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(serde_json::json!({ "removed": removed })))
}

pub async fn my_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_favorite_listings(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let listings: Vec<ListingResponse> =
        rows.into_iter().map(|row| listing_response(row, true)).collect();
    Ok(Json(listings))
}
