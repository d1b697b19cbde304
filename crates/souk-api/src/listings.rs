use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use souk_db::models::{ListingFilter, ListingRow};
use souk_types::api::{Claims, CreateListingRequest, ListingResponse, UpdateListingRequest};
use souk_types::domain::{Condition, ListingStatus, Role};
use souk_types::time::parse_db_timestamp;

use crate::auth::AppState;
use crate::middleware::claims_from_headers;
use crate::parse_uuid;

/// Categories always offered in the filter UI, merged with whatever
/// categories exist in the data.
const PREDEFINED_CATEGORIES: &[&str] = &["Bikes", "Clothing", "Electronics", "Furniture", "Other"];

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub category: Option<String>,
    pub max_price: Option<f64>,
    pub location: Option<String>,
    /// Inclusive lower bound on creation date, "YYYY-MM-DD".
    pub min_date: Option<String>,
    pub condition: Option<String>,
    /// Case-insensitive substring match on title or description, applied
    /// in memory after the store-side filters.
    pub search: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Case-insensitive substring match against title or description.
fn matches_search(row: &ListingRow, term: &str) -> bool {
    let term = term.to_lowercase();
    row.title.to_lowercase().contains(&term) || row.description.to_lowercase().contains(&term)
}

pub(crate) fn listing_response(row: ListingRow, favorite: bool) -> ListingResponse {
    ListingResponse {
        id: parse_uuid(&row.id, "listing id"),
        owner_id: parse_uuid(&row.owner_id, "owner id"),
        title: row.title,
        description: row.description,
        price: row.price,
        category: row.category,
        location: row.location,
        condition: Condition::parse(&row.condition).unwrap_or(Condition::Used),
        image_url: row.image_url,
        status: ListingStatus::parse(&row.status).unwrap_or(ListingStatus::Pending),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
        favorite,
    }
}

/// Newest-first feed. Store-side filters are conjunctive; the free-text
/// search runs in memory afterwards. Anonymous viewers get `favorite:
/// false` on every listing; authenticated viewers get their favorites
/// cross-referenced.
pub async fn feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let viewer = claims_from_headers(&headers, &state.jwt_secret).map(|c| c.sub.to_string());

    let filter = ListingFilter {
        category: non_empty(query.category),
        max_price: query.max_price,
        location: non_empty(query.location),
        min_date: non_empty(query.min_date),
        condition: non_empty(query.condition),
    };
    let search = non_empty(query.search);

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let viewer_id = viewer;
    let (rows, favorite_ids) = tokio::task::spawn_blocking(move || {
        let rows = db
            .db
            .list_listings(&filter)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let favorite_ids = match &viewer_id {
            Some(uid) => db
                .db
                .favorite_listing_ids(uid)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
            None => Vec::new(),
        };
        Ok::<_, StatusCode>((rows, favorite_ids))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    let favorite_ids: HashSet<String> = favorite_ids.into_iter().collect();

    let listings: Vec<ListingResponse> = rows
        .into_iter()
        .filter(|row| search.as_deref().is_none_or(|term| matches_search(row, term)))
        .map(|row| {
            let favorite = favorite_ids.contains(&row.id);
            listing_response(row, favorite)
        })
        .collect();

    Ok(Json(listings))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .db
        .get_listing(&listing_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let favorite = match claims_from_headers(&headers, &state.jwt_secret) {
        Some(claims) => state
            .db
            .favorite_listing_ids(&claims.sub.to_string())
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .contains(&row.id),
        None => false,
    };

    Ok(Json(listing_response(row, favorite)))
}

/// Distinct categories present in listings merged with the predefined set.
pub async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let stored = state
        .db
        .distinct_categories()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(merge_categories(stored)))
}

fn merge_categories(stored: Vec<String>) -> Vec<String> {
    let mut all: HashSet<String> = stored.into_iter().filter(|c| !c.is_empty()).collect();
    for cat in PREDEFINED_CATEGORIES {
        all.insert((*cat).to_string());
    }
    let mut sorted: Vec<String> = all.into_iter().collect();
    sorted.sort();
    sorted
}

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.title.trim().is_empty() || req.title.len() > 120 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !req.price.is_finite() || req.price < 0.0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if user.blocked {
        return Err(StatusCode::FORBIDDEN);
    }

    let listing_id = Uuid::new_v4();
    state
        .db
        .insert_listing(
            &listing_id.to_string(),
            req.title.trim(),
            &req.description,
            req.price,
            &req.category,
            &req.location,
            req.condition.as_str(),
            req.image_url.as_deref(),
            &claims.sub.to_string(),
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let row = state
        .db
        .get_listing(&listing_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::CREATED, Json(listing_response(row, false))))
}

pub async fn update_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.title.trim().is_empty() || req.title.len() > 120 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !req.price.is_finite() || req.price < 0.0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let row = state
        .db
        .get_listing(&listing_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    if row.owner_id != claims.sub.to_string() {
        return Err(StatusCode::FORBIDDEN);
    }

    state
        .db
        .update_listing(
            &listing_id.to_string(),
            req.title.trim(),
            &req.description,
            req.price,
            &req.category,
            &req.location,
            req.condition.as_str(),
            req.image_url.as_deref(),
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let row = state
        .db
        .get_listing(&listing_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(listing_response(row, false)))
}

/// Owner or moderator.
pub async fn delete_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let row = state
        .db
        .get_listing(&listing_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if row.owner_id != claims.sub.to_string() {
        let caller = state
            .db
            .get_user_by_id(&claims.sub.to_string())
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;
        if Role::parse(&caller.role) != Some(Role::Admin) {
            return Err(StatusCode::FORBIDDEN);
        }
    }

    state
        .db
        .delete_listing(&listing_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn my_listings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_listings_by_owner(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let listings: Vec<ListingResponse> =
        rows.into_iter().map(|row| listing_response(row, false)).collect();
    Ok(Json(listings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(title: &str, description: &str) -> ListingRow {
        ListingRow {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            price: 10.0,
            category: "Electronics".to_string(),
            location: "Casablanca".to_string(),
            condition: "used".to_string(),
            image_url: None,
            owner_id: Uuid::new_v4().to_string(),
            status: "pending".to_string(),
            created_at: "2026-01-01 00:00:00".to_string(),
            updated_at: "2026-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn search_is_case_insensitive_on_title_and_description() {
        let phone = row("iPhone 12", "Lightly used");
        let bike = row("City bike", "A sturdy COMMUTER bike");

        assert!(matches_search(&phone, "iphone"));
        assert!(matches_search(&bike, "commuter"));
        assert!(!matches_search(&phone, "bike"));
    }

    #[test]
    fn empty_filter_params_are_dropped() {
        assert_eq!(non_empty(Some("".into())), None);
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some("Bikes".into())), Some("Bikes".into()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn categories_merge_and_sort_without_duplicates() {
        let merged = merge_categories(vec!["Electronics".into(), "Plants".into(), "".into()]);
        assert!(merged.contains(&"Plants".to_string()));
        assert!(merged.contains(&"Bikes".to_string()));
        assert_eq!(
            merged.iter().filter(|c| c.as_str() == "Electronics").count(),
            1
        );
        let mut sorted = merged.clone();
        sorted.sort();
        assert_eq!(merged, sorted);
    }
}
