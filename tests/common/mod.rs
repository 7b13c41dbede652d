#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use git2::{Repository, Signature};
use serde_json::{json, Value};

use repo_pilot::config::{AppConfig, GitBackend};

pub const API_KEY: &str = "test-internal-key";
pub const HTML_URL: &str = "https://github.com/myorg/myrepo/pull/7";

/// A request the fake upstream received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
pub struct FakeUpstream {
    pub token_status: StatusCode,
    pub token_body: Value,
    pub pr_status: StatusCode,
    pub pr_body: Value,
    pub token_requests: Arc<Mutex<Vec<Recorded>>>,
    pub pr_requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeUpstream {
    /// Token service that issues credentials for `repository_url`.
    pub fn issuing(repository_url: &str) -> Self {
        Self {
            token_status: StatusCode::OK,
            token_body: json!({
                "githubAppToken": "app-token",
                "installationToken": "install-token",
                "repositoryUrl": repository_url,
                "repositoryName": "myrepo",
                "organizationName": "myorg",
                "expiresAt": "2026-10-16T13:00:00.000Z",
                "installationId": 99
            }),
            pr_status: StatusCode::CREATED,
            pr_body: json!({ "html_url": HTML_URL, "number": 7, "id": 1007, "state": "open" }),
            token_requests: Arc::default(),
            pr_requests: Arc::default(),
        }
    }

    pub fn token_calls(&self) -> usize {
        self.token_requests.lock().unwrap().len()
    }

    pub fn pr_calls(&self) -> usize {
        self.pr_requests.lock().unwrap().len()
    }

    /// Serve on an ephemeral port; returns the base URL.
    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/api/github/tokens", post(tokens))
            .route("/repos/:owner/:repo/pulls", post(pulls))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }
}

async fn tokens(
    State(fake): State<FakeUpstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.token_requests.lock().unwrap().push(Recorded {
        path: "/api/github/tokens".to_string(),
        authorization: header(&headers, "authorization"),
        body: body.clone(),
    });

    // Mirror the real service's request validation
    let has_id = body.get("repositoryId").is_some_and(|v| !v.is_null());
    let has_name = body.get("organizationName").is_some_and(|v| !v.is_null())
        && body.get("repositoryName").is_some_and(|v| !v.is_null());
    if !has_id && !has_name {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Either repositoryId OR both organizationName and repositoryName are required"
            })),
        );
    }

    (fake.token_status, Json(fake.token_body.clone()))
}

async fn pulls(
    State(fake): State<FakeUpstream>,
    UrlPath((owner, repo)): UrlPath<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.pr_requests.lock().unwrap().push(Recorded {
        path: format!("/repos/{owner}/{repo}/pulls"),
        authorization: header(&headers, "authorization"),
        body,
    });
    (fake.pr_status, Json(fake.pr_body.clone()))
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Bare repository with a single commit on `main`.
pub fn fixture_remote(root: &Path) -> String {
    let bare_path = root.join("remote.git");
    let bare = Repository::init_bare(&bare_path).unwrap();

    let sig = Signature::now("Fixture", "fixture@example.com").unwrap();
    let blob = bare.blob(b"# myrepo\n").unwrap();
    let mut builder = bare.treebuilder(None).unwrap();
    builder.insert("README.md", blob, 0o100644).unwrap();
    let tree = bare.find_tree(builder.write().unwrap()).unwrap();
    bare.commit(Some("refs/heads/main"), &sig, &sig, "initial", &tree, &[])
        .unwrap();
    bare.set_head("refs/heads/main").unwrap();

    bare_path.to_str().unwrap().to_string()
}

/// Content of `file` on `branch` in the bare remote, if present.
pub fn read_pushed_file(remote: &str, branch: &str, file: &str) -> Option<String> {
    let bare = Repository::open_bare(remote).unwrap();
    let reference = bare.find_reference(&format!("refs/heads/{branch}")).ok()?;
    let tree = reference.peel_to_tree().unwrap();
    let entry = tree.get_path(Path::new(file)).ok()?;
    let blob = bare.find_blob(entry.id()).unwrap();
    Some(String::from_utf8_lossy(blob.content()).into_owned())
}

pub fn config(upstream: &str, workspace: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.service.base_url = upstream.to_string();
    config.service.internal_api_key = API_KEY.to_string();
    config.github.api_url = upstream.to_string();
    config.git.backend = GitBackend::Libgit2;
    config.workspace.base_dir = workspace.to_path_buf();
    config
}
