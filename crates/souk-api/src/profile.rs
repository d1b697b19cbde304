use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use souk_db::models::UserRow;
use souk_types::api::{Claims, ProfileResponse, UpdateProfileRequest};
use souk_types::domain::Role;

use crate::auth::AppState;
use crate::parse_uuid;

fn profile_response(row: UserRow) -> ProfileResponse {
    ProfileResponse {
        id: parse_uuid(&row.id, "user id"),
        email: row.email,
        display_name: row.display_name,
        phone: row.phone,
        phone_code: row.phone_code,
        address: row.address,
        gender: row.gender,
        phone_public: row.phone_public,
        role: Role::parse(&row.role).unwrap_or(Role::User),
    }
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .db
        .get_user_by_id(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok(Json(profile_response(row)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let display_name = req.display_name.trim();
    if display_name.is_empty() || display_name.len() > 64 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let updated = state
        .db
        .update_profile(
            &claims.sub.to_string(),
            display_name,
            req.phone.as_deref(),
            req.phone_code.as_deref(),
            req.address.as_deref(),
            req.gender.as_deref(),
            req.phone_public,
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !updated {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let row = state
        .db
        .get_user_by_id(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok(Json(profile_response(row)))
}
