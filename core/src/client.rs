//! The Posterous client: configuration, token cache, and typed operations.
//!
//! # Design
//! `PosterousClient` owns its collaborators (a `Transport` and a `Parser`)
//! and the one piece of mutable state, the lazily fetched API token. The
//! token slot sits behind a mutex that is held for the whole
//! check-fetch-store sequence, so concurrent calls on a shared client fetch
//! at most one token.
//!
//! The typed methods are thin: each forwards to the binder with its endpoint
//! descriptor and converts the payload into the expected domain type.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::binder::{self, BoundOperation};
use crate::config::ClientConfig;
use crate::endpoint::{Endpoint, ModelKind};
use crate::endpoints;
use crate::error::{ApiError, ParseError};
use crate::http::Transport;
use crate::parser::{Model, ModelParser, Parser, Payload};
use crate::types::{ApiToken, Comment, Post, Site, Tag};
use crate::value::Args;

/// Client for the Posterous API.
///
/// `T` executes HTTP requests; `P` parses response bodies and defaults to
/// the JSON `ModelParser`.
pub struct PosterousClient<T, P = ModelParser> {
    config: ClientConfig,
    token: Mutex<Option<String>>,
    transport: T,
    parser: P,
}

impl<T: Transport> PosterousClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self::with_parser(config, transport, ModelParser)
    }
}

impl<T, P> PosterousClient<T, P> {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    pub fn cached_token(&self) -> Option<String> {
        self.lock_token().clone()
    }

    /// Use `token` for token-authenticated calls instead of fetching one.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.lock_token() = Some(token.into());
    }

    /// Forget the cached token; the next token-authenticated call fetches a
    /// fresh one.
    pub fn clear_token(&self) {
        *self.lock_token() = None;
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport, P: Parser> PosterousClient<T, P> {
    pub fn with_parser(config: ClientConfig, transport: T, parser: P) -> Self {
        Self {
            config,
            token: Mutex::new(None),
            transport,
            parser,
        }
    }

    /// Bind `endpoint` to this client.
    pub fn bind(&self, endpoint: &'static Endpoint) -> BoundOperation<'_, T, P> {
        BoundOperation::new(self, endpoint)
    }

    /// Invoke `endpoint` with `args` and return the raw payload.
    pub fn call(&self, endpoint: &'static Endpoint, args: Args) -> Result<Payload, ApiError> {
        binder::invoke(self, endpoint, args)
    }

    /// Cached token, fetching and caching one first if needed.
    pub(crate) fn ensure_token(&self, endpoint: &'static Endpoint) -> Result<String, ApiError> {
        let mut slot = self.lock_token();
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        if self.config.basic_credentials().is_none() {
            return Err(ApiError::Authentication {
                endpoint: endpoint.name,
            });
        }

        debug!(endpoint = endpoint.name, "fetching api token");
        let payload = binder::invoke(self, &endpoints::GET_API_TOKEN, Args::new())?;
        let token = expect_one::<ApiToken>(payload)?.api_token;
        *slot = Some(token.clone());
        Ok(token)
    }

    // -----------------------------------------------------------------------
    // Typed operations
    // -----------------------------------------------------------------------

    /// Fetch the user's API token and cache it on the client.
    pub fn get_api_token(&self, args: Args) -> Result<ApiToken, ApiError> {
        let token: ApiToken = expect_one(self.call(&endpoints::GET_API_TOKEN, args)?)?;
        self.set_token(token.api_token.clone());
        Ok(token)
    }

    pub fn get_sites(&self) -> Result<Vec<Site>, ApiError> {
        expect_many(self.call(&endpoints::GET_SITES, Args::new())?)
    }

    /// Accepts `site_id`, `hostname`, `num_posts`, `page`, `tag`.
    pub fn read_posts(&self, args: Args) -> Result<Vec<Post>, ApiError> {
        expect_many(self.call(&endpoints::READ_POSTS, args)?)
    }

    /// Accepts `id` (a Post.ly shortcode).
    pub fn get_post(&self, args: Args) -> Result<Post, ApiError> {
        expect_one(self.call(&endpoints::GET_POST, args)?)
    }

    /// Accepts `site_id`, `hostname`.
    pub fn get_tags(&self, args: Args) -> Result<Vec<Tag>, ApiError> {
        expect_many(self.call(&endpoints::GET_TAGS, args)?)
    }

    /// Accepts `site_id`, `title`, `body`, `media`, `autopost`, `private`,
    /// `date`, `tags`, `source`, `sourceLink`.
    pub fn new_post(&self, args: Args) -> Result<Post, ApiError> {
        expect_one(self.call(&endpoints::NEW_POST, args)?)
    }

    /// Accepts `post_id`, `title`, `body`, `media`.
    pub fn update_post(&self, args: Args) -> Result<Post, ApiError> {
        expect_one(self.call(&endpoints::UPDATE_POST, args)?)
    }

    /// Accepts `post_id`, `comment`, `name`, `email`, `date`.
    pub fn new_comment(&self, args: Args) -> Result<Comment, ApiError> {
        expect_one(self.call(&endpoints::NEW_COMMENT, args)?)
    }

    /// Accepts `site_id`, `post_id`.
    pub fn delete_post(&self, args: Args) -> Result<serde_json::Value, ApiError> {
        expect_one(self.call(&endpoints::DELETE_POST, args)?)
    }

    /// Accepts `username`, `password`, `media`, `message`, `body`, `source`,
    /// `sourceLink`.
    pub fn twitter_upload(&self, args: Args) -> Result<serde_json::Value, ApiError> {
        expect_one(self.call(&endpoints::TWITTER_UPLOAD, args)?)
    }

    /// Same parameters as `twitter_upload`.
    pub fn twitter_upload_and_post(&self, args: Args) -> Result<serde_json::Value, ApiError> {
        expect_one(self.call(&endpoints::TWITTER_UPLOAD_AND_POST, args)?)
    }
}

impl<T, P> fmt::Debug for PosterousClient<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosterousClient")
            .field("username", &self.config.username)
            .field("host", &self.config.host)
            .field("api_root", &self.config.api_root)
            .finish_non_exhaustive()
    }
}

/// Domain types that can be pulled out of a parsed `Model`.
trait FromModel: Sized {
    const KIND: ModelKind;
    fn from_model(model: Model) -> Result<Self, Model>;
}

macro_rules! from_model {
    ($ty:ty, $variant:ident) => {
        impl FromModel for $ty {
            const KIND: ModelKind = ModelKind::$variant;
            fn from_model(model: Model) -> Result<Self, Model> {
                match model {
                    Model::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    };
}

from_model!(ApiToken, ApiToken);
from_model!(Site, Site);
from_model!(Post, Post);
from_model!(Tag, Tag);
from_model!(Comment, Comment);
from_model!(serde_json::Value, Json);

fn convert<M: FromModel>(model: Model) -> Result<M, ApiError> {
    M::from_model(model).map_err(|other| {
        ParseError::ShapeMismatch {
            expected: M::KIND.as_str().to_string(),
            found: other.kind().as_str().to_string(),
        }
        .into()
    })
}

fn expect_one<M: FromModel>(payload: Payload) -> Result<M, ApiError> {
    convert(payload.into_one()?)
}

fn expect_many<M: FromModel>(payload: Payload) -> Result<Vec<M>, ApiError> {
    payload.into_many()?.into_iter().map(convert).collect()
}
