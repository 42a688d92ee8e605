pub mod dto;
pub mod handlers;
pub mod memory;
pub mod multipart;
pub mod repo;
pub mod services;
pub mod validation;

use axum::Router;

use crate::state::AppState;

pub use dto::{Page, Profile, ProfilePayload, Social, SocialPayload};
pub use memory::MemoryProfileStore;
pub use repo::{PgProfileStore, ProfileStore};

/// Collection routes, mounted at `/profiles` and at the legacy `/DevProfiles`.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::routes("/profiles", max_upload_bytes))
        .merge(handlers::routes("/DevProfiles", max_upload_bytes))
}
