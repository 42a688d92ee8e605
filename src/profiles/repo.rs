use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::dto::{Page, Profile, ProfilePayload, Removed, Replaced, Social};
use super::validation::{validate, ImageRule, ValidProfile};
use crate::error::{AppError, AppResult};

/// Persistence boundary for profiles and their socials.
///
/// Every mutation validates before touching storage and writes the parent
/// row and its socials as one unit. Unknown ids fail with
/// [`AppError::NotFound`].
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn create(&self, payload: &ProfilePayload) -> AppResult<Profile>;

    /// Validates the whole batch first, then commits each record on its own.
    /// A persistence failure stops the batch; earlier records stay.
    async fn bulk_create(&self, payloads: &[ProfilePayload]) -> AppResult<Vec<Profile>>;

    async fn find_all(&self, page: Page) -> AppResult<Vec<Profile>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Profile>;

    /// Replaces scalar fields and the full social list. A payload without an
    /// image keeps the stored one.
    async fn update(&self, id: Uuid, payload: &ProfilePayload) -> AppResult<Replaced>;

    async fn destroy(&self, id: Uuid) -> AppResult<Removed>;

    /// Removes every profile, returning the image keys they referenced.
    async fn destroy_all(&self) -> AppResult<Vec<String>>;
}

pub(crate) fn validate_new(payload: &ProfilePayload) -> AppResult<ValidProfile> {
    Ok(validate(payload, ImageRule::Required)?)
}

pub(crate) fn validate_replacement(payload: &ProfilePayload) -> AppResult<ValidProfile> {
    Ok(validate(payload, ImageRule::Optional)?)
}

/// Current time at the precision Postgres keeps.
pub(crate) fn now_micros() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

pub(crate) fn build_socials(v: &ValidProfile) -> Vec<Social> {
    v.socials
        .iter()
        .map(|s| Social {
            id: Uuid::new_v4(),
            name: s.name.clone(),
            url: s.url.clone(),
        })
        .collect()
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    name: String,
    bio: String,
    email: String,
    image: String,
    location: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct SocialRow {
    id: Uuid,
    profile_id: Uuid,
    name: String,
    url: String,
}

impl ProfileRow {
    fn into_profile(self, socials: Vec<Social>) -> Profile {
        Profile {
            id: self.id,
            name: self.name,
            bio: self.bio,
            email: self.email,
            image: self.image,
            location: self.location,
            socials,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        v: &ValidProfile,
        image: &str,
    ) -> AppResult<Profile> {
        let id = Uuid::new_v4();
        let now = now_micros();
        sqlx::query(
            r#"
            INSERT INTO profiles (id, name, bio, email, image, location, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            "#,
        )
        .bind(id)
        .bind(&v.name)
        .bind(&v.bio)
        .bind(&v.email)
        .bind(image)
        .bind(&v.location)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        let socials = build_socials(v);
        Self::insert_socials_tx(tx, id, &socials).await?;

        Ok(Profile {
            id,
            name: v.name.clone(),
            bio: v.bio.clone(),
            email: v.email.clone(),
            image: image.to_string(),
            location: v.location.clone(),
            socials,
            created_at: now,
            updated_at: now,
        })
    }

    async fn insert_socials_tx(
        tx: &mut Transaction<'_, Postgres>,
        profile_id: Uuid,
        socials: &[Social],
    ) -> AppResult<()> {
        for (pos, s) in socials.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO socials (id, profile_id, position, name, url)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(s.id)
            .bind(profile_id)
            .bind(pos as i32)
            .bind(&s.name)
            .bind(&s.url)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn socials_for(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<Social>>> {
        let rows = sqlx::query_as::<_, SocialRow>(
            r#"
            SELECT id, profile_id, name, url
              FROM socials
             WHERE profile_id = ANY($1)
             ORDER BY profile_id, position
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_profile: HashMap<Uuid, Vec<Social>> = HashMap::new();
        for r in rows {
            by_profile.entry(r.profile_id).or_default().push(Social {
                id: r.id,
                name: r.name,
                url: r.url,
            });
        }
        Ok(by_profile)
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    #[instrument(skip_all)]
    async fn create(&self, payload: &ProfilePayload) -> AppResult<Profile> {
        let v = validate_new(payload)?;
        let image = v.image().unwrap_or_default().to_string();
        let mut tx = self.db.begin().await?;
        let profile = Self::insert_tx(&mut tx, &v, &image).await?;
        tx.commit().await?;
        debug!(id = %profile.id, socials = profile.socials.len(), "profile inserted");
        Ok(profile)
    }

    #[instrument(skip_all, fields(count = payloads.len()))]
    async fn bulk_create(&self, payloads: &[ProfilePayload]) -> AppResult<Vec<Profile>> {
        let valid = payloads
            .iter()
            .map(validate_new)
            .collect::<AppResult<Vec<_>>>()?;

        let mut out = Vec::with_capacity(valid.len());
        for v in &valid {
            let image = v.image().unwrap_or_default();
            let mut tx = self.db.begin().await?;
            out.push(Self::insert_tx(&mut tx, v, image).await?);
            tx.commit().await?;
        }
        Ok(out)
    }

    async fn find_all(&self, page: Page) -> AppResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, name, bio, email, image, location, created_at, updated_at
              FROM profiles
             ORDER BY created_at ASC, id ASC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit.map(i64::from))
        .bind(i64::from(page.offset.unwrap_or(0)))
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut socials = self.socials_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let s = socials.remove(&r.id).unwrap_or_default();
                r.into_profile(s)
            })
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, name, bio, email, image, location, created_at, updated_at
              FROM profiles
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound(id))?;

        let socials = self.socials_for(&[id]).await?.remove(&id).unwrap_or_default();
        Ok(row.into_profile(socials))
    }

    #[instrument(skip(self, payload))]
    async fn update(&self, id: Uuid, payload: &ProfilePayload) -> AppResult<Replaced> {
        let v = validate_replacement(payload)?;

        let mut tx = self.db.begin().await?;
        // row lock: a concurrent destroy either waits for us or makes us miss
        let current = sqlx::query_as::<_, (String, OffsetDateTime)>(
            "SELECT image, created_at FROM profiles WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((old_image, created_at)) = current else {
            return Err(AppError::NotFound(id));
        };

        let image = v.image().unwrap_or(&old_image).to_string();
        let now = now_micros();
        sqlx::query(
            r#"
            UPDATE profiles
               SET name = $2, bio = $3, email = $4, image = $5, location = $6, updated_at = $7
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&v.name)
        .bind(&v.bio)
        .bind(&v.email)
        .bind(&image)
        .bind(&v.location)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM socials WHERE profile_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let socials = build_socials(&v);
        Self::insert_socials_tx(&mut tx, id, &socials).await?;
        tx.commit().await?;

        let orphaned_image = (image != old_image).then_some(old_image);
        Ok(Replaced {
            profile: Profile {
                id,
                name: v.name,
                bio: v.bio,
                email: v.email,
                image,
                location: v.location,
                socials,
                created_at,
                updated_at: now,
            },
            orphaned_image,
        })
    }

    #[instrument(skip(self))]
    async fn destroy(&self, id: Uuid) -> AppResult<Removed> {
        // socials go with the parent through ON DELETE CASCADE
        let image = sqlx::query_scalar::<_, String>(
            "DELETE FROM profiles WHERE id = $1 RETURNING image",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound(id))?;
        Ok(Removed { image })
    }

    async fn destroy_all(&self) -> AppResult<Vec<String>> {
        let images = sqlx::query_scalar::<_, String>("DELETE FROM profiles RETURNING image")
            .fetch_all(&self.db)
            .await?;
        Ok(images)
    }
}
