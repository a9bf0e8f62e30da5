//! In-memory stand-in for the Posterous API v2.
//!
//! Implements the endpoints the client's descriptor table declares, with the
//! same conventions: form-encoded POST bodies with `name[]` list keys, Basic
//! auth via `Authorization`, token auth via the `api_token` header, and JSON
//! responses. One demo user is seeded so tests can authenticate.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use url::form_urlencoded;
use uuid::Uuid;

pub const DEMO_USERNAME: &str = "alice@example.com";
pub const DEMO_PASSWORD: &str = "secret";
pub const DEMO_SITE_ID: i64 = 1;
pub const DEMO_HOSTNAME: &str = "alice.posterous.com";

const DEFAULT_NUM_POSTS: usize = 10;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub full_hostname: String,
    pub url: String,
    pub is_private: bool,
    pub posts_count: u32,
    #[serde(skip)]
    pub owner: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub site_id: i64,
    pub title: String,
    pub body_full: String,
    pub slug: String,
    pub short_code: String,
    pub full_url: String,
    pub is_private: bool,
    pub autopost: bool,
    pub display_date: Option<String>,
    pub comments_count: u32,
    pub tags: Vec<Tag>,
    pub media: Vec<String>,
    pub source: Option<String>,
    #[serde(rename = "sourceLink")]
    pub source_link: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub body: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    users: HashMap<String, String>,
    tokens: HashMap<String, String>,
    sites: Vec<Site>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    tags: Vec<Tag>,
    next_id: i64,
}

impl Store {
    /// A store holding the demo user and their one public site.
    pub fn seeded() -> Self {
        let mut store = Store {
            next_id: 100,
            ..Store::default()
        };
        store
            .users
            .insert(DEMO_USERNAME.to_string(), DEMO_PASSWORD.to_string());
        store.sites.push(Site {
            id: DEMO_SITE_ID,
            name: "alice".to_string(),
            full_hostname: DEMO_HOSTNAME.to_string(),
            url: format!("http://{DEMO_HOSTNAME}"),
            is_private: false,
            posts_count: 0,
            owner: DEMO_USERNAME.to_string(),
        });
        store
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tag(&mut self, name: &str) -> Tag {
        if let Some(tag) = self.tags.iter().find(|t| t.name == name) {
            return tag.clone();
        }
        let tag = Tag {
            id: self.next_id(),
            name: name.to_string(),
        };
        self.tags.push(tag.clone());
        tag
    }

    fn site_for(&self, site_id: Option<i64>, hostname: Option<&str>) -> Option<&Site> {
        self.sites.iter().find(|s| match (site_id, hostname) {
            (Some(id), _) => s.id == id,
            (None, Some(host)) => s.full_hostname == host,
            (None, None) => false,
        })
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    let api = Router::new()
        .route("/auth/token", get(api_token))
        .route("/users/me/sites", get(my_sites))
        .route("/readposts", get(read_posts))
        .route("/getpost", get(get_post))
        .route("/gettags", get(get_tags))
        .route("/newpost", post(new_post))
        .route("/updatepost", post(update_post))
        .route("/newcomment", post(new_comment))
        .route("/sites/{site_id}/posts/{post_id}", delete(delete_post))
        .route("/upload", post(twitter_upload))
        .route("/uploadAndPost", post(twitter_upload_and_post));
    Router::new()
        .nest("/api/2", api)
        .layer(middleware::from_fn(log_request))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!(%method, %path, status = response.status().as_u16(), "handled request");
    response
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Decoded `application/x-www-form-urlencoded` pairs, in order.
#[derive(Debug, Default)]
pub struct FormPairs(Vec<(String, String)>);

impl FormPairs {
    pub fn parse(input: &[u8]) -> Self {
        Self(form_urlencoded::parse(input).into_owned().collect())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Values of a list parameter: every `name[]` entry, or a lone `name`.
    pub fn list(&self, name: &str) -> Vec<String> {
        let key = format!("{name}[]");
        let values: Vec<String> = self
            .0
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .collect();
        if values.is_empty() {
            self.get(name).map(|v| vec![v.to_string()]).unwrap_or_default()
        } else {
            values
        }
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, StatusCode> {
        self.get(name)
            .map(|v| v.parse().map_err(|_| StatusCode::BAD_REQUEST))
            .transpose()
    }

    pub fn flag(&self, name: &str) -> Result<bool, StatusCode> {
        match self.get(name) {
            None | Some("0") => Ok(false),
            Some("1") => Ok(true),
            Some(_) => Err(StatusCode::BAD_REQUEST),
        }
    }
}

fn query_pairs(query: Option<String>) -> FormPairs {
    FormPairs::parse(query.unwrap_or_default().as_bytes())
}

/// Username from a valid `Authorization: Basic` header.
fn basic_user(store: &Store, headers: &HeaderMap) -> Result<String, StatusCode> {
    let encoded = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let (user, pass) = decoded.split_once(':').ok_or(StatusCode::UNAUTHORIZED)?;
    match store.users.get(user) {
        Some(expected) if expected == pass => Ok(user.to_string()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Username owning the `api_token` header's token.
fn token_user(store: &Store, headers: &HeaderMap) -> Result<String, StatusCode> {
    headers
        .get("api_token")
        .and_then(|v| v.to_str().ok())
        .and_then(|token| store.tokens.get(token))
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)
}

fn owned_site(store: &Store, user: &str, site_id: Option<i64>) -> Result<i64, StatusCode> {
    let site = match site_id {
        Some(id) => store.sites.iter().find(|s| s.id == id),
        None => store.sites.iter().find(|s| s.owner == user),
    }
    .ok_or(StatusCode::NOT_FOUND)?;
    if site.owner != user {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(site.id)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn api_token(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut store = db.write().await;
    let user = basic_user(&store, &headers)?;
    let token = Uuid::new_v4().simple().to_string();
    store.tokens.insert(token.clone(), user);
    Ok(Json(json!({ "api_token": token })))
}

async fn my_sites(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Site>>, StatusCode> {
    let store = db.read().await;
    let user = token_user(&store, &headers)?;
    Ok(Json(
        store
            .sites
            .iter()
            .filter(|s| s.owner == user)
            .cloned()
            .collect(),
    ))
}

async fn read_posts(
    State(db): State<Db>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<Post>>, StatusCode> {
    let params = query_pairs(query);
    let store = db.read().await;
    let site = store
        .site_for(params.int("site_id")?, params.get("hostname"))
        .ok_or(StatusCode::BAD_REQUEST)?;
    let per_page = params
        .int("num_posts")?
        .map_or(DEFAULT_NUM_POSTS, |n| n.max(0) as usize);
    let page = params.int("page")?.unwrap_or(1).max(1) as usize;
    let offset = (page - 1)
        .checked_mul(per_page)
        .ok_or(StatusCode::BAD_REQUEST)?;
    let tag = params.get("tag");

    let posts = store
        .posts
        .iter()
        .rev()
        .filter(|p| p.site_id == site.id && !p.is_private)
        .filter(|p| tag.map_or(true, |t| p.tags.iter().any(|pt| pt.name == t)))
        .skip(offset)
        .take(per_page)
        .cloned()
        .collect();
    Ok(Json(posts))
}

async fn get_post(State(db): State<Db>, RawQuery(query): RawQuery) -> Result<Json<Post>, StatusCode> {
    let params = query_pairs(query);
    let id = params.get("id").ok_or(StatusCode::BAD_REQUEST)?;
    let store = db.read().await;
    store
        .posts
        .iter()
        .find(|p| p.short_code == id && !p.is_private)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_tags(State(db): State<Db>, RawQuery(query): RawQuery) -> Result<Json<Vec<Tag>>, StatusCode> {
    let params = query_pairs(query);
    let store = db.read().await;
    let site = store
        .site_for(params.int("site_id")?, params.get("hostname"))
        .ok_or(StatusCode::BAD_REQUEST)?;
    let mut tags: Vec<Tag> = Vec::new();
    for post in store.posts.iter().filter(|p| p.site_id == site.id && !p.is_private) {
        for tag in &post.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
    }
    Ok(Json(tags))
}

async fn new_post(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Post>, StatusCode> {
    let form = FormPairs::parse(&body);
    let mut store = db.write().await;
    let user = basic_user(&store, &headers)?;
    let site_id = owned_site(&store, &user, form.int("site_id")?)?;

    let id = store.next_id();
    let short_code = format!("{id:x}");
    let title = form.get("title").unwrap_or("Untitled").to_string();
    let tags: Vec<Tag> = form
        .get("tags")
        .map(|t| {
            t.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| store.tag(t))
                .collect()
        })
        .unwrap_or_default();

    let post = Post {
        id,
        site_id,
        slug: title.to_lowercase().replace(' ', "-"),
        title,
        body_full: form.get("body").unwrap_or_default().to_string(),
        full_url: format!("http://post.ly/{short_code}"),
        short_code,
        is_private: form.flag("private")?,
        autopost: form.flag("autopost")?,
        display_date: form.get("date").map(str::to_string),
        comments_count: 0,
        tags,
        media: form.list("media"),
        source: form.get("source").map(str::to_string),
        source_link: form.get("sourceLink").map(str::to_string),
    };
    if let Some(site) = store.sites.iter_mut().find(|s| s.id == site_id) {
        site.posts_count += 1;
    }
    store.posts.push(post.clone());
    Ok(Json(post))
}

async fn update_post(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Post>, StatusCode> {
    let form = FormPairs::parse(&body);
    let mut store = db.write().await;
    let user = basic_user(&store, &headers)?;
    let post_id = form.int("post_id")?.ok_or(StatusCode::BAD_REQUEST)?;
    let site_id = store
        .posts
        .iter()
        .find(|p| p.id == post_id)
        .map(|p| p.site_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    owned_site(&store, &user, Some(site_id))?;

    let post = store
        .posts
        .iter_mut()
        .find(|p| p.id == post_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(title) = form.get("title") {
        post.title = title.to_string();
    }
    if let Some(body) = form.get("body") {
        post.body_full = body.to_string();
    }
    let media = form.list("media");
    if !media.is_empty() {
        post.media = media;
    }
    Ok(Json(post.clone()))
}

async fn new_comment(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Comment>, StatusCode> {
    let form = FormPairs::parse(&body);
    let mut store = db.write().await;
    basic_user(&store, &headers)?;
    let post_id = form.int("post_id")?.ok_or(StatusCode::BAD_REQUEST)?;
    let text = form.get("comment").ok_or(StatusCode::BAD_REQUEST)?.to_string();

    let id = store.next_id();
    let post = store
        .posts
        .iter_mut()
        .find(|p| p.id == post_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    post.comments_count += 1;

    let comment = Comment {
        id,
        post_id,
        body: text,
        name: form.get("name").map(str::to_string),
        email: form.get("email").map(str::to_string),
        created_at: form.get("date").map(str::to_string),
    };
    store.comments.push(comment.clone());
    Ok(Json(comment))
}

async fn delete_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((site_id, post_id)): Path<(i64, i64)>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut store = db.write().await;
    let user = token_user(&store, &headers)?;
    owned_site(&store, &user, Some(site_id))?;
    let index = store
        .posts
        .iter()
        .position(|p| p.id == post_id && p.site_id == site_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    store.posts.remove(index);
    store.comments.retain(|c| c.post_id != post_id);
    if let Some(site) = store.sites.iter_mut().find(|s| s.id == site_id) {
        site.posts_count = site.posts_count.saturating_sub(1);
    }
    Ok(Json(json!({ "id": post_id, "deleted": true })))
}

async fn twitter_upload(State(db): State<Db>, body: Bytes) -> Result<Json<serde_json::Value>, StatusCode> {
    upload(db, &FormPairs::parse(&body), false).await
}

async fn twitter_upload_and_post(
    State(db): State<Db>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, StatusCode> {
    upload(db, &FormPairs::parse(&body), true).await
}

async fn upload(db: Db, form: &FormPairs, tweet: bool) -> Result<Json<serde_json::Value>, StatusCode> {
    let username = form.get("username").filter(|u| !u.is_empty());
    let password = form.get("password").filter(|p| !p.is_empty());
    if username.is_none() || password.is_none() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let id = db.write().await.next_id();
    let media_id = format!("{id:x}");
    let mut receipt = json!({
        "mediaid": media_id,
        "url": format!("http://post.ly/{media_id}"),
        "media": form.list("media"),
    });
    if tweet {
        receipt["tweeted"] = json!(form.get("message").unwrap_or_default());
    }
    Ok(Json(receipt))
}
