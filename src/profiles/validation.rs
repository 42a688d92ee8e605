use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{ProfilePayload, SocialPayload};
use crate::error::ValidationErrors;

pub const NAME_MAX: usize = 255;
pub const SOCIAL_NAME_MAX: usize = 100;
pub const URL_MAX: usize = 2048;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref URL_RE: Regex = Regex::new(r"^https?://[^\s/?#]+\.[^\s/?#]+([/?#]\S*)?$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSocial {
    pub name: String,
    pub url: String,
}

/// A payload that passed validation: trimmed, email lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidProfile {
    pub name: String,
    pub bio: String,
    pub email: String,
    pub location: Option<String>,
    pub image: Option<String>,
    pub socials: Vec<ValidSocial>,
}

impl ValidProfile {
    /// The image key; only `None` for updates that keep the current image.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRule {
    Required,
    Optional,
}

fn required(
    errs: &mut ValidationErrors,
    field: &str,
    value: Option<&String>,
    max: Option<usize>,
) -> String {
    let v = value.map(|s| s.trim()).unwrap_or_default();
    if v.is_empty() {
        errs.push(field, "is required");
    } else if let Some(max) = max {
        if v.chars().count() > max {
            errs.push(field, format!("must be at most {max} characters"));
        }
    }
    v.to_string()
}

fn social(errs: &mut ValidationErrors, pos: usize, s: &SocialPayload) -> ValidSocial {
    let idx = s.index.unwrap_or(pos);
    let name = required(
        errs,
        &format!("socials[{idx}][name]"),
        s.name.as_ref(),
        Some(SOCIAL_NAME_MAX),
    );
    let field = format!("socials[{idx}][url]");
    let url = required(errs, &field, s.url.as_ref(), Some(URL_MAX));
    if !url.is_empty() && !is_valid_url(&url) {
        errs.push(field, "must be an http(s) URL");
    }
    ValidSocial { name, url }
}

/// Validates every field and reports all failures together.
pub fn validate(
    payload: &ProfilePayload,
    image: ImageRule,
) -> Result<ValidProfile, ValidationErrors> {
    let mut errs = ValidationErrors::default();

    let name = required(&mut errs, "name", payload.name.as_ref(), Some(NAME_MAX));
    let bio = required(&mut errs, "bio", payload.bio.as_ref(), None);
    let email = required(&mut errs, "email", payload.email.as_ref(), Some(NAME_MAX)).to_lowercase();
    if !email.is_empty() && !is_valid_email(&email) {
        errs.push("email", "is not a valid email");
    }

    let location = payload
        .location
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    if location.as_ref().is_some_and(|l| l.chars().count() > NAME_MAX) {
        errs.push("location", format!("must be at most {NAME_MAX} characters"));
    }

    let img = payload
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    if img.is_none() && image == ImageRule::Required {
        errs.push("image", "is required");
    }

    let socials = payload
        .socials
        .iter()
        .enumerate()
        .map(|(i, s)| social(&mut errs, i, s))
        .collect();

    errs.into_result()?;
    Ok(ValidProfile {
        name,
        bio,
        email,
        location,
        image: img,
        socials,
    })
}
