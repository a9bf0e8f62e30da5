//! Domain objects returned by the Posterous API.
//!
//! # Design
//! Field names follow the service's JSON. Everything except the id is
//! defaulted so that sparse responses (e.g. a comment without an author
//! name) still parse.

use serde::{Deserialize, Serialize};

/// Token returned by `auth/token`, sent back in the `api_token` header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiToken {
    pub api_token: String,
}

/// A site owned or authored by the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_hostname: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub posts_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub site_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body_full: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub full_url: String,
    #[serde(default)]
    pub is_private: bool,
    /// Publication date as sent by the service.
    #[serde(default)]
    pub display_date: Option<String>,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Media references attached to the post.
    #[serde(default)]
    pub media: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub post_id: Option<i64>,
    #[serde(default)]
    pub body: String,
    /// Set for anonymous comments left by the site owner on someone's behalf.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
