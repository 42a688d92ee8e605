use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Profile fields as submitted, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePayload {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    /// Storage key of the image (or, for generated payloads, a sample file path).
    pub image: Option<String>,
    #[serde(default)]
    pub socials: Vec<SocialPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPayload {
    pub name: Option<String>,
    pub url: Option<String>,
    /// Index the entry was submitted under, used to label its errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Social {
    pub id: Uuid,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub email: String,
    pub image: String,
    pub location: Option<String>,
    pub socials: Vec<Social>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// `?offset=&limit=` on the collection; both optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl Page {
    pub fn new(offset: Option<u32>, limit: Option<u32>) -> Self {
        Self { offset, limit }
    }

    pub fn all() -> Self {
        Self::default()
    }

    /// Applies offset then limit to an already ordered sequence.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let it = items.into_iter().skip(self.offset.unwrap_or(0) as usize);
        match self.limit {
            Some(limit) => it.take(limit as usize).collect(),
            None => it.collect(),
        }
    }
}

/// Result of a successful update.
#[derive(Debug, Clone)]
pub struct Replaced {
    pub profile: Profile,
    /// Previous image key, no longer referenced by the record.
    pub orphaned_image: Option<String>,
}

/// Result of a successful destroy.
#[derive(Debug, Clone)]
pub struct Removed {
    pub image: String,
}
