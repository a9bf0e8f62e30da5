//! Response parsing: turning raw bodies into domain objects.
//!
//! # Design
//! The binder hands the body and the endpoint's `ResponseShape` to a `Parser`
//! and returns whatever it produces. `ModelParser` is the default and reads
//! the service's JSON with serde; callers can plug in their own (a caching
//! layer, a different wire format) without touching the binder.

use serde::de::DeserializeOwned;

use crate::endpoint::{ModelKind, ResponseShape};
use crate::error::ParseError;
use crate::types::{ApiToken, Comment, Post, Site, Tag};

/// One parsed domain object.
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    ApiToken(ApiToken),
    Site(Site),
    Post(Post),
    Tag(Tag),
    Comment(Comment),
    Json(serde_json::Value),
}

impl Model {
    pub fn kind(&self) -> ModelKind {
        match self {
            Model::ApiToken(_) => ModelKind::ApiToken,
            Model::Site(_) => ModelKind::Site,
            Model::Post(_) => ModelKind::Post,
            Model::Tag(_) => ModelKind::Tag,
            Model::Comment(_) => ModelKind::Comment,
            Model::Json(_) => ModelKind::Json,
        }
    }
}

/// Result of parsing: one object or an ordered list, per the shape's flag.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    One(Model),
    Many(Vec<Model>),
}

impl Payload {
    /// The single model, or a shape mismatch if this is a list.
    pub fn into_one(self) -> Result<Model, ParseError> {
        match self {
            Payload::One(model) => Ok(model),
            Payload::Many(models) => Err(ParseError::ShapeMismatch {
                expected: "a single object".to_string(),
                found: format!("a list of {}", models.len()),
            }),
        }
    }

    /// The list of models, or a shape mismatch if this is a single object.
    pub fn into_many(self) -> Result<Vec<Model>, ParseError> {
        match self {
            Payload::Many(models) => Ok(models),
            Payload::One(model) => Err(ParseError::ShapeMismatch {
                expected: "a list".to_string(),
                found: model.kind().as_str().to_string(),
            }),
        }
    }
}

/// Converts a raw response body into a `Payload` of the expected shape.
pub trait Parser {
    fn parse(&self, body: &[u8], shape: ResponseShape) -> Result<Payload, ParseError>;
}

impl<P: Parser + ?Sized> Parser for &P {
    fn parse(&self, body: &[u8], shape: ResponseShape) -> Result<Payload, ParseError> {
        (**self).parse(body, shape)
    }
}

/// Default parser for the service's JSON responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelParser;

impl Parser for ModelParser {
    fn parse(&self, body: &[u8], shape: ResponseShape) -> Result<Payload, ParseError> {
        if shape.list {
            let items: Vec<serde_json::Value> = from_slice(body)?;
            items
                .into_iter()
                .map(|item| model_from_value(item, shape.model))
                .collect::<Result<Vec<_>, _>>()
                .map(Payload::Many)
        } else {
            let value: serde_json::Value = from_slice(body)?;
            if value.is_array() && shape.model != ModelKind::Json {
                return Err(ParseError::ShapeMismatch {
                    expected: shape.to_string(),
                    found: "a list".to_string(),
                });
            }
            model_from_value(value, shape.model).map(Payload::One)
        }
    }
}

fn model_from_value(value: serde_json::Value, kind: ModelKind) -> Result<Model, ParseError> {
    Ok(match kind {
        ModelKind::ApiToken => Model::ApiToken(typed(value)?),
        ModelKind::Site => Model::Site(typed(value)?),
        ModelKind::Post => Model::Post(typed(value)?),
        ModelKind::Tag => Model::Tag(typed(value)?),
        ModelKind::Comment => Model::Comment(typed(value)?),
        ModelKind::Json => Model::Json(value),
    })
}

fn from_slice<T: DeserializeOwned>(body: &[u8]) -> Result<T, ParseError> {
    serde_json::from_slice(body).map_err(|e| ParseError::Malformed(e.to_string()))
}

fn typed<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ParseError> {
    serde_json::from_value(value).map_err(|e| ParseError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str, shape: ResponseShape) -> Result<Payload, ParseError> {
        ModelParser.parse(body.as_bytes(), shape)
    }

    #[test]
    fn parses_list_of_sites() {
        let payload = parse(
            r#"[{"id":1,"name":"one"},{"id":2,"name":"two"}]"#,
            ResponseShape::many(ModelKind::Site),
        )
        .unwrap();
        let models = payload.into_many().unwrap();
        assert_eq!(models.len(), 2);
        assert!(matches!(&models[1], Model::Site(site) if site.name == "two"));
    }

    #[test]
    fn parses_single_token() {
        let payload = parse(r#"{"api_token":"t0k"}"#, ResponseShape::one(ModelKind::ApiToken)).unwrap();
        assert_eq!(
            payload.into_one().unwrap(),
            Model::ApiToken(ApiToken { api_token: "t0k".to_string() })
        );
    }

    #[test]
    fn list_body_for_single_shape_is_a_mismatch() {
        let err = parse(r#"[{"id":1}]"#, ResponseShape::one(ModelKind::Post)).unwrap_err();
        assert!(matches!(err, ParseError::ShapeMismatch { .. }));
    }

    #[test]
    fn object_body_for_list_shape_is_malformed() {
        let err = parse(r#"{"id":1}"#, ResponseShape::many(ModelKind::Post)).unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn json_model_keeps_arbitrary_values() {
        let payload = parse(r#"[1,"two"]"#, ResponseShape::one(ModelKind::Json)).unwrap();
        assert_eq!(payload, Payload::One(Model::Json(serde_json::json!([1, "two"]))));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse("<rsp stat=\"fail\"/>", ResponseShape::one(ModelKind::Post)).unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn payload_shape_accessors() {
        let one = Payload::One(Model::Json(serde_json::Value::Null));
        assert!(matches!(one.into_many(), Err(ParseError::ShapeMismatch { .. })));
        let many = Payload::Many(Vec::new());
        assert!(matches!(many.into_one(), Err(ParseError::ShapeMismatch { .. })));
    }
}
