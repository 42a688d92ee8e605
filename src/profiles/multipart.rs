use std::collections::BTreeMap;

use axum::extract::multipart::{Multipart, MultipartError};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::dto::{ProfilePayload, SocialPayload};
use crate::error::{AppError, AppResult};
use crate::images::services::{mime_from_file_name, UploadItem};

pub const MAX_SOCIAL_ENTRIES: usize = 50;

lazy_static! {
    static ref SOCIAL_KEY_RE: Regex = Regex::new(r"^socials\[(\d+)\]\[(name|url)\]$").unwrap();
}

/// A decoded `multipart/form-data` profile submission.
#[derive(Debug, Default)]
pub struct ProfileForm {
    pub payload: ProfilePayload,
    pub image: Option<UploadItem>,
}

#[derive(Debug, Default)]
struct FormBuilder {
    payload: ProfilePayload,
    socials: BTreeMap<usize, SocialPayload>,
    image: Option<UploadItem>,
}

impl FormBuilder {
    fn text(&mut self, key: &str, value: String) -> AppResult<()> {
        match key {
            "name" => self.payload.name = Some(value),
            "bio" => self.payload.bio = Some(value),
            "email" => self.payload.email = Some(value),
            "location" => self.payload.location = Some(value),
            _ => {
                let Some(caps) = SOCIAL_KEY_RE.captures(key) else {
                    debug!(%key, "ignoring unknown form field");
                    return Ok(());
                };
                let idx: usize = caps[1]
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("bad social index in {key}")))?;
                if !self.socials.contains_key(&idx) && self.socials.len() >= MAX_SOCIAL_ENTRIES {
                    return Err(AppError::BadRequest(format!(
                        "at most {MAX_SOCIAL_ENTRIES} socials are accepted"
                    )));
                }
                let entry = self.socials.entry(idx).or_default();
                if &caps[2] == "name" {
                    entry.name = Some(value);
                } else {
                    entry.url = Some(value);
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> ProfileForm {
        let mut payload = self.payload;
        // ordered by index; gaps collapse but each entry keeps its index
        payload.socials = self
            .socials
            .into_iter()
            .map(|(idx, mut s)| {
                s.index = Some(idx);
                s
            })
            .collect();
        ProfileForm {
            payload,
            image: self.image,
        }
    }
}

fn form_error(e: MultipartError) -> AppError {
    AppError::Multipart {
        status: e.status(),
        message: e.body_text(),
    }
}

fn resolve_content_type(declared: Option<&str>, file_name: Option<&str>) -> String {
    match declared {
        Some(ct) if ct != "application/octet-stream" => ct.to_string(),
        _ => file_name
            .and_then(mime_from_file_name)
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}

/// Reads every field of the form. The `image` part is buffered in memory;
/// the router's body limit bounds its size.
pub async fn read_profile_form(mut mp: Multipart) -> AppResult<ProfileForm> {
    let mut form = FormBuilder::default();
    while let Some(field) = mp.next_field().await.map_err(form_error)? {
        let Some(key) = field.name().map(str::to_string) else {
            continue;
        };
        if key == "image" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = resolve_content_type(field.content_type(), file_name.as_deref());
            let body = field.bytes().await.map_err(form_error)?;
            // browsers send an empty part when no file was picked
            if body.is_empty() && file_name.as_deref().unwrap_or_default().is_empty() {
                continue;
            }
            form.image = Some(UploadItem { body, content_type });
        } else {
            let value = field.text().await.map_err(form_error)?;
            form.text(&key, value)?;
        }
    }
    Ok(form.finish())
}
