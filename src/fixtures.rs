//! Randomized, schema-valid profile payloads for tests and seeding.
//!
//! Values are random but the shape never changes: every required field is
//! present, so a generated payload can be sent as-is. Seeded generators
//! replay the same sequence of payloads.

use fake::faker::address::en::{CityName, CountryName};
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::Paragraph;
use fake::faker::name::en::Name;
use fake::Fake;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::profiles::dto::{ProfilePayload, SocialPayload};

/// Sample images shipped with the crate, usable as upload attachments.
pub const SAMPLE_IMAGES: &[&str] = &[
    concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/images/avatar-1.png"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/images/avatar-2.png"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/images/avatar-3.png"),
];

/// Default upper bound for a random number of socials.
pub const MAX_SOCIALS: usize = 5;

const PLATFORMS: &[(&str, &str)] = &[
    ("GitHub", "github.com"),
    ("Twitter", "twitter.com"),
    ("LinkedIn", "linkedin.com/in"),
    ("GitLab", "gitlab.com"),
    ("Dev.to", "dev.to"),
    ("Stack Overflow", "stackoverflow.com/users"),
    ("YouTube", "youtube.com/@"),
];

#[derive(Debug, Clone)]
pub struct ProfileGenerator {
    rng: ChaCha8Rng,
}

impl ProfileGenerator {
    /// Same seed, same payloads.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Random integer in `min..=max + min`.
    pub fn generate_num(&mut self, max: usize, min: usize) -> usize {
        self.rng.gen_range(min..=max + min)
    }

    /// A vector of `generate_num(max, min)` items built by `f(index)`.
    pub fn generate_many<T>(
        &mut self,
        max: usize,
        min: usize,
        mut f: impl FnMut(&mut Self, usize) -> T,
    ) -> Vec<T> {
        let n = self.generate_num(max, min);
        (0..n).map(|i| f(self, i)).collect()
    }

    pub fn generate_social(&mut self) -> SocialPayload {
        let (platform, host) = *PLATFORMS
            .choose(&mut self.rng)
            .unwrap_or(&PLATFORMS[0]);
        let user: String = Username().fake_with_rng(&mut self.rng);
        let sep = if host.ends_with('@') { "" } else { "/" };
        SocialPayload {
            name: Some(platform.to_string()),
            url: Some(format!("https://{host}{sep}{user}")),
            index: None,
        }
    }

    /// A complete payload.
    ///
    /// With `with_image` the image is the path of one of [`SAMPLE_IMAGES`];
    /// otherwise it is a storage key with no file behind it, which is enough
    /// for inserting straight into a store. `social_count` fixes the number
    /// of socials, `None` picks `0..=MAX_SOCIALS`.
    pub fn generate_profile(
        &mut self,
        with_image: bool,
        social_count: Option<usize>,
    ) -> ProfilePayload {
        let name: String = Name().fake_with_rng(&mut self.rng);
        let bio: String = Paragraph(1..3).fake_with_rng(&mut self.rng);
        let email: String = SafeEmail().fake_with_rng(&mut self.rng);
        let city: String = CityName().fake_with_rng(&mut self.rng);
        let country: String = CountryName().fake_with_rng(&mut self.rng);

        let image = if with_image {
            SAMPLE_IMAGES
                .choose(&mut self.rng)
                .unwrap_or(&SAMPLE_IMAGES[0])
                .to_string()
        } else {
            let id = Uuid::from_bytes(self.rng.gen());
            format!("uploads/{id}.png")
        };

        let socials = match social_count {
            Some(n) => (0..n).map(|_| self.generate_social()).collect(),
            None => self.generate_many(MAX_SOCIALS, 0, |g, _| g.generate_social()),
        };

        ProfilePayload {
            name: Some(name),
            bio: Some(bio),
            email: Some(email),
            location: Some(format!("{city}, {country}")),
            image: Some(image),
            socials,
        }
    }

    pub fn generate_profiles(&mut self, n: usize) -> Vec<ProfilePayload> {
        (0..n).map(|_| self.generate_profile(false, None)).collect()
    }
}

impl Default for ProfileGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}
