use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{Page, Profile};
use super::multipart::read_profile_form;
use super::services::{create_profile, delete_profile, update_profile};
use crate::error::AppResult;
use crate::state::AppState;

/// Collection and item routes under `prefix`. The collection answers with
/// and without a trailing slash.
pub fn routes(prefix: &str, max_upload_bytes: usize) -> Router<AppState> {
    let collection = get(list_profiles).post(create_profile_multipart);
    Router::new()
        .route(prefix, collection.clone())
        .route(&format!("{prefix}/"), collection)
        .route(
            &format!("{prefix}/:id"),
            get(get_profile)
                .put(update_profile_multipart)
                .delete(delete_profile_by_id),
        )
        // room for the text fields around the image
        .layer(DefaultBodyLimit::max(max_upload_bytes + 64 * 1024))
}

#[instrument(skip(state))]
pub async fn list_profiles(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<Profile>>> {
    let profiles = state.store.find_all(page).await?;
    Ok(Json(profiles))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Profile>> {
    Ok(Json(state.store.find_by_id(id).await?))
}

/// POST multipart: name, bio, email, location?, socials[i][name|url], image (file)
#[instrument(skip(state, mp))]
pub async fn create_profile_multipart(
    State(state): State<AppState>,
    mp: Multipart,
) -> AppResult<(StatusCode, HeaderMap, Json<Profile>)> {
    let form = read_profile_form(mp).await?;
    let profile = create_profile(&state, form).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/profiles/{}", profile.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(profile)))
}

#[instrument(skip(state, mp))]
pub async fn update_profile_multipart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> AppResult<Json<Profile>> {
    let form = read_profile_form(mp).await?;
    Ok(Json(update_profile(&state, id, form).await?))
}

#[instrument(skip(state))]
pub async fn delete_profile_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    delete_profile(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
