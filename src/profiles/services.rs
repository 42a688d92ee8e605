use tracing::{info, warn};
use uuid::Uuid;

use super::dto::Profile;
use super::multipart::ProfileForm;
use super::repo::validate_replacement;
use super::validation::{validate, ImageRule};
use crate::error::{AppError, AppResult};
use crate::images::services::{check_upload, discard_image, remove_image, store_image};
use crate::state::AppState;

/// Validate, store the image, insert. The image is discarded if the insert fails.
pub async fn create_profile(st: &AppState, form: ProfileForm) -> AppResult<Profile> {
    let ProfileForm { mut payload, image } = form;
    // the file itself counts as the image until it has a storage key
    let rule = if image.is_some() {
        ImageRule::Optional
    } else {
        ImageRule::Required
    };
    validate(&payload, rule)?;
    let upload = image.ok_or_else(|| AppError::BadRequest("image is required".into()))?;
    check_upload(&upload)?;

    let key = store_image(st.storage.as_ref(), upload).await?;
    payload.image = Some(key.clone());
    match st.store.create(&payload).await {
        Ok(profile) => {
            info!(id = %profile.id, image = %key, "profile created");
            Ok(profile)
        }
        Err(e) => {
            discard_image(st.storage.as_ref(), &key).await;
            Err(e)
        }
    }
}

/// Full replacement. A new image replaces the old one, which is removed
/// only after the record no longer points at it.
pub async fn update_profile(st: &AppState, id: Uuid, form: ProfileForm) -> AppResult<Profile> {
    let ProfileForm { mut payload, image } = form;
    payload.image = None;
    validate_replacement(&payload)?;
    if let Some(upload) = &image {
        check_upload(upload)?;
    }

    let new_key = match image {
        Some(upload) => Some(store_image(st.storage.as_ref(), upload).await?),
        None => None,
    };
    payload.image = new_key.clone();

    let replaced = match st.store.update(id, &payload).await {
        Ok(r) => r,
        Err(e) => {
            if let Some(key) = &new_key {
                discard_image(st.storage.as_ref(), key).await;
            }
            return Err(e);
        }
    };

    if let Some(old) = &replaced.orphaned_image {
        remove_image(st.storage.as_ref(), old).await?;
    }
    info!(%id, replaced_image = replaced.orphaned_image.is_some(), "profile updated");
    Ok(replaced.profile)
}

pub async fn delete_profile(st: &AppState, id: Uuid) -> AppResult<()> {
    let removed = st.store.destroy(id).await?;
    remove_image(st.storage.as_ref(), &removed.image).await?;
    info!(%id, image = %removed.image, "profile deleted");
    Ok(())
}

/// Clears every profile and its image. Used to reset state between test runs.
pub async fn purge_profiles(st: &AppState) -> AppResult<usize> {
    let images = st.store.destroy_all().await?;
    for key in &images {
        if let Err(e) = remove_image(st.storage.as_ref(), key).await {
            warn!(error = %e, %key, "purge left an image behind");
        }
    }
    Ok(images.len())
}
