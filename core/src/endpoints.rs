//! The Posterous API v2 endpoint table.

use crate::endpoint::{AuthRequirement, Endpoint, ModelKind, Param, ResponseShape};
use crate::value::ValueType;

const INT: &[ValueType] = &[ValueType::Int];
const STR: &[ValueType] = &[ValueType::Str];
const BOOL: &[ValueType] = &[ValueType::Bool];
const DATE: &[ValueType] = &[ValueType::Timestamp];
/// One file reference or a list of them.
const MEDIA: &[ValueType] = &[ValueType::Str, ValueType::List];

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Returns the user's API token.
pub static GET_API_TOKEN: Endpoint = Endpoint::get("get_api_token", "auth/token")
    .params(&[Param::new("username", STR), Param::new("password", STR)])
    .auth(AuthRequirement::Basic)
    .returns(ResponseShape::one(ModelKind::ApiToken))
    .issues_token();

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// All sites owned and authored by the authenticated user.
pub static GET_SITES: Endpoint = Endpoint::get("get_sites", "users/me/sites")
    .auth(AuthRequirement::Token)
    .returns(ResponseShape::many(ModelKind::Site));

/// Posts of a site. Without authentication, `site_id` or `hostname` is
/// required and only public posts are returned.
pub static READ_POSTS: Endpoint = Endpoint::get("read_posts", "readposts")
    .params(&[
        Param::new("site_id", INT),
        Param::new("hostname", STR),
        Param::new("num_posts", INT),
        Param::new("page", INT),
        Param::new("tag", STR),
    ])
    .returns(ResponseShape::many(ModelKind::Post));

/// A single post by its Post.ly shortcode (`123abc` in `http://post.ly/123abc`).
pub static GET_POST: Endpoint = Endpoint::get("get_post", "getpost")
    .params(&[Param::new("id", STR)])
    .returns(ResponseShape::one(ModelKind::Post));

pub static GET_TAGS: Endpoint = Endpoint::get("get_tags", "gettags")
    .params(&[Param::new("site_id", INT), Param::new("hostname", STR)])
    .returns(ResponseShape::many(ModelKind::Tag));

// ---------------------------------------------------------------------------
// Posting
// ---------------------------------------------------------------------------

pub static NEW_POST: Endpoint = Endpoint::post("new_post", "newpost")
    .params(&[
        Param::new("site_id", INT),
        Param::new("title", STR),
        Param::new("body", STR),
        Param::new("media", MEDIA),
        Param::new("autopost", BOOL),
        Param::new("private", BOOL),
        Param::new("date", DATE),
        Param::new("tags", STR),
        Param::new("source", STR),
        Param::new("sourceLink", STR),
    ])
    .auth(AuthRequirement::Basic)
    .returns(ResponseShape::one(ModelKind::Post));

pub static UPDATE_POST: Endpoint = Endpoint::post("update_post", "updatepost")
    .params(&[
        Param::new("post_id", INT),
        Param::new("title", STR),
        Param::new("body", STR),
        Param::new("media", MEDIA),
    ])
    .auth(AuthRequirement::Basic)
    .returns(ResponseShape::one(ModelKind::Post));

/// Comments as the authenticated user, or anonymously under `name`/`email`
/// when the caller owns the site.
pub static NEW_COMMENT: Endpoint = Endpoint::post("new_comment", "newcomment")
    .params(&[
        Param::new("post_id", INT),
        Param::new("comment", STR),
        Param::new("name", STR),
        Param::new("email", STR),
        Param::new("date", DATE),
    ])
    .auth(AuthRequirement::Basic)
    .returns(ResponseShape::one(ModelKind::Comment));

pub static DELETE_POST: Endpoint = Endpoint::delete("delete_post", "sites/{site_id}/posts/{post_id}")
    .params(&[Param::new("site_id", INT), Param::new("post_id", INT)])
    .auth(AuthRequirement::Token)
    .returns(ResponseShape::one(ModelKind::Json));

// ---------------------------------------------------------------------------
// Twitter
// ---------------------------------------------------------------------------

const TWITTER_PARAMS: &[Param] = &[
    Param::new("username", STR),
    Param::new("password", STR),
    Param::new("media", MEDIA),
    Param::new("message", STR),
    Param::new("body", STR),
    Param::new("source", STR),
    Param::new("sourceLink", STR),
];

/// Posts media with Twitter credentials passed as parameters. Unregistered
/// Twitter users get a new site.
pub static TWITTER_UPLOAD: Endpoint = Endpoint::post("twitter_upload", "upload")
    .params(TWITTER_PARAMS)
    .returns(ResponseShape::one(ModelKind::Json));

/// Like `TWITTER_UPLOAD`, and also tweets the message with a link.
pub static TWITTER_UPLOAD_AND_POST: Endpoint =
    Endpoint::post("twitter_upload_and_post", "uploadAndPost")
        .params(TWITTER_PARAMS)
        .returns(ResponseShape::one(ModelKind::Json));

/// Every endpoint in the table.
pub static ALL: &[&Endpoint] = &[
    &GET_API_TOKEN,
    &GET_SITES,
    &READ_POSTS,
    &GET_POST,
    &GET_TAGS,
    &NEW_POST,
    &UPDATE_POST,
    &NEW_COMMENT,
    &DELETE_POST,
    &TWITTER_UPLOAD,
    &TWITTER_UPLOAD_AND_POST,
];

/// Look an endpoint up by name.
pub fn find(name: &str) -> Option<&'static Endpoint> {
    ALL.iter().copied().find(|ep| ep.name == name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = ALL.iter().map(|ep| ep.name).collect();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn find_by_name() {
        assert_eq!(find("new_post").map(|ep| ep.path), Some("newpost"));
        assert!(find("no_such_method").is_none());
    }

    #[test]
    fn placeholders_name_declared_params() {
        for ep in ALL {
            for name in ep.placeholders() {
                assert!(ep.param(name).is_some(), "{}: undeclared placeholder {name}", ep.name);
            }
        }
    }

    #[test]
    fn only_the_token_endpoint_issues_tokens() {
        let issuers: Vec<_> = ALL.iter().filter(|ep| ep.issues_token).map(|ep| ep.name).collect();
        assert_eq!(issuers, vec!["get_api_token"]);
        assert_ne!(GET_API_TOKEN.auth, AuthRequirement::Token);
    }

    #[test]
    fn new_post_schema_order() {
        let names: Vec<_> = NEW_POST.params.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "site_id", "title", "body", "media", "autopost", "private", "date", "tags",
                "source", "sourceLink"
            ]
        );
    }
}
