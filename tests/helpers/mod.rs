// Shared harness for HTTP tests: an app on an in-memory store with files
// under a temp dir, plus a small multipart body builder.
#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use devprofiles::{
    build_app,
    config::AppConfig,
    fixtures::ProfileGenerator,
    profiles::{MemoryProfileStore, Profile, ProfilePayload},
    state::AppState,
    storage::{LocalStorage, StorageClient},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "devprofiles-test-boundary-7MA4YWxkTrZu0gW";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub storage: LocalStorage,
    pub gen: ProfileGenerator,
    dir: TempDir,
}

impl TestApp {
    pub fn new(seed: u64) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path());
        let state = AppState::from_parts(
            Arc::new(AppConfig::local(dir.path())),
            Arc::new(MemoryProfileStore::new()),
            Arc::new(storage.clone()),
        );
        Self {
            router: build_app(state.clone()),
            state,
            storage,
            gen: ProfileGenerator::seeded(seed),
            dir,
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Number of files currently under `uploads/`.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.uploads_dir())
            .map(|rd| rd.count())
            .unwrap_or(0)
    }

    pub async fn image_exists(&self, key: &str) -> bool {
        self.storage.exists(key).await.expect("stat image")
    }

    pub async fn insert_profiles(&mut self, n: usize) -> Vec<Profile> {
        let payloads = self.gen.generate_profiles(n);
        self.state.store.bulk_create(&payloads).await.expect("bulk insert")
    }

    /// Inserts one profile whose image key has a real file behind it.
    pub async fn insert_profile(&mut self) -> Profile {
        let payload = self.gen.generate_profile(false, Some(2));
        let key = payload.image.clone().expect("generated image key");
        self.storage
            .put_object(&key, Bytes::from_static(b"\x89PNG old"), "image/png")
            .await
            .expect("store image");
        self.state.store.create(&payload).await.expect("insert")
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let res = self.router.clone().oneshot(req).await.expect("request");
        let status = res.status();
        let location = res
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = res.into_body().collect().await.expect("body").to_bytes();
        TestResponse {
            status,
            location,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        let req = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    pub async fn multipart(&self, method: Method, uri: &str, form: MultipartForm) -> TestResponse {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.finish()))
            .unwrap();
        self.send(req).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Attaches the sample image file at `path` as the `image` part.
    pub fn attach(self, path: &str) -> Self {
        let data = std::fs::read(path).expect("sample image");
        let file_name = path.rsplit('/').next().unwrap_or("image.png").to_string();
        self.file("image", &file_name, "image/png", &data)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// Builds the form for a generated payload, leaving out the fields in `skip`
/// and attaching the payload's sample image when `attach` is set.
pub fn profile_form(p: &ProfilePayload, skip: &[&str], attach: bool) -> MultipartForm {
    let mut form = MultipartForm::new();
    let scalars = [
        ("name", &p.name),
        ("bio", &p.bio),
        ("email", &p.email),
        ("location", &p.location),
    ];
    for (key, value) in scalars {
        if let (false, Some(v)) = (skip.contains(&key), value) {
            form = form.field(key, v);
        }
    }
    for (i, s) in p.socials.iter().enumerate() {
        if let Some(name) = &s.name {
            form = form.field(&format!("socials[{i}][name]"), name);
        }
        if let Some(url) = &s.url {
            form = form.field(&format!("socials[{i}][url]"), url);
        }
    }
    if attach {
        form = form.attach(p.image.as_deref().expect("payload with image"));
    }
    form
}
