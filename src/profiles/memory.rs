use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::dto::{Page, Profile, ProfilePayload, Removed, Replaced};
use super::repo::{build_socials, now_micros, validate_new, validate_replacement, ProfileStore};
use super::validation::ValidProfile;
use crate::error::{AppError, AppResult};

/// In-process store; records are listed in insertion order.
#[derive(Default)]
pub struct MemoryProfileStore {
    rows: RwLock<Vec<Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(v: ValidProfile) -> Profile {
        let now = now_micros();
        let socials = build_socials(&v);
        Profile {
            id: Uuid::new_v4(),
            image: v.image.unwrap_or_default(),
            name: v.name,
            bio: v.bio,
            email: v.email,
            location: v.location,
            socials,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn create(&self, payload: &ProfilePayload) -> AppResult<Profile> {
        let profile = Self::build(validate_new(payload)?);
        self.rows.write().await.push(profile.clone());
        Ok(profile)
    }

    async fn bulk_create(&self, payloads: &[ProfilePayload]) -> AppResult<Vec<Profile>> {
        let valid = payloads
            .iter()
            .map(validate_new)
            .collect::<AppResult<Vec<_>>>()?;
        let created: Vec<Profile> = valid.into_iter().map(Self::build).collect();
        self.rows.write().await.extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_all(&self, page: Page) -> AppResult<Vec<Profile>> {
        let rows = self.rows.read().await;
        Ok(page.slice(rows.iter().cloned()))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Profile> {
        self.rows
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(AppError::NotFound(id))
    }

    async fn update(&self, id: Uuid, payload: &ProfilePayload) -> AppResult<Replaced> {
        let v = validate_replacement(payload)?;
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(AppError::NotFound(id))?;

        let socials = build_socials(&v);
        let old_image = row.image.clone();
        if let Some(image) = v.image {
            row.image = image;
        }
        row.name = v.name;
        row.bio = v.bio;
        row.email = v.email;
        row.location = v.location;
        row.socials = socials;
        row.updated_at = now_micros();

        let orphaned_image = (row.image != old_image).then_some(old_image);
        Ok(Replaced {
            profile: row.clone(),
            orphaned_image,
        })
    }

    async fn destroy(&self, id: Uuid) -> AppResult<Removed> {
        let mut rows = self.rows.write().await;
        let idx = rows
            .iter()
            .position(|p| p.id == id)
            .ok_or(AppError::NotFound(id))?;
        let removed = rows.remove(idx);
        Ok(Removed {
            image: removed.image,
        })
    }

    async fn destroy_all(&self) -> AppResult<Vec<String>> {
        let mut rows = self.rows.write().await;
        Ok(rows.drain(..).map(|p| p.image).collect())
    }
}
