//! Synchronous client for the Posterous blogging API (v2).
//!
//! # Overview
//! Every remote operation is described by a static `Endpoint` descriptor
//! (path, verb, parameter schema, auth mode, response shape). A single
//! binder turns a descriptor plus call arguments into a validated, encoded,
//! authenticated `HttpRequest`, hands it to a `Transport`, and parses the
//! answer with a `Parser`.
//!
//! # Design
//! - Host-does-IO: the crate never opens a connection. The caller supplies a
//!   `Transport`, which keeps the binder deterministic and testable.
//! - Arguments are dynamic (`Args` of `Value`s) and checked against the
//!   endpoint schema at call time; typed wrappers on `PosterousClient`
//!   return domain objects.
//! - The API token is fetched lazily and cached on the client under a mutex.
//!
//! ```no_run
//! use posterous_core::{Args, ClientConfig, HttpRequest, HttpResponse, PosterousClient, Transport, TransportError};
//!
//! struct MyTransport;
//! impl Transport for MyTransport {
//!     fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
//!         unimplemented!("execute {} {}", request.method, request.url)
//!     }
//! }
//!
//! let client = PosterousClient::new(
//!     ClientConfig::new().credentials("user@example.com", "secret"),
//!     MyTransport,
//! );
//! let post = client.new_post(
//!     Args::new().arg(1).arg("Hello").arg("World").kw("media", vec!["a.jpg", "b.jpg"]),
//! )?;
//! println!("created post {}", post.id);
//! # Ok::<(), posterous_core::ApiError>(())
//! ```

pub mod binder;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod parser;
pub mod types;
pub mod value;

#[cfg(test)]
mod testing;

pub use binder::BoundOperation;
pub use client::PosterousClient;
pub use config::ClientConfig;
pub use endpoint::{AuthRequirement, Endpoint, ModelKind, Param, ResponseShape};
pub use error::{ApiError, ParseError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use parser::{Model, ModelParser, Parser, Payload};
pub use types::{ApiToken, Comment, Post, Site, Tag};
pub use value::{Args, Value, ValueType};
