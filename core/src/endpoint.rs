//! Endpoint descriptors: declarative descriptions of one remote operation.
//!
//! # Design
//! Descriptors are plain data built with `const fn` constructors, so the whole
//! table in `endpoints` is evaluated at compile time. The constructors assert
//! the shape rules (non-empty names and paths, non-empty type sets, no
//! duplicate parameter names, list parameters also accepting a scalar type);
//! a malformed descriptor is a build error rather than a runtime surprise.

use std::fmt;

use crate::http::HttpMethod;
use crate::value::ValueType;

/// Credentials an endpoint needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    None,
    /// `Authorization: Basic` with the client's username and password.
    Basic,
    /// The cached `api_token`, fetched on first use.
    Token,
}

/// Domain type a response body parses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    ApiToken,
    Site,
    Post,
    Tag,
    Comment,
    /// Untyped JSON, returned as-is.
    Json,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::ApiToken => "api_token",
            ModelKind::Site => "site",
            ModelKind::Post => "post",
            ModelKind::Tag => "tag",
            ModelKind::Comment => "comment",
            ModelKind::Json => "json",
        }
    }
}

/// Whether a response is one model or an ordered list of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseShape {
    pub model: ModelKind,
    pub list: bool,
}

impl ResponseShape {
    pub const fn one(model: ModelKind) -> Self {
        Self { model, list: false }
    }

    pub const fn many(model: ModelKind) -> Self {
        Self { model, list: true }
    }
}

impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.list {
            write!(f, "list of {}", self.model.as_str())
        } else {
            f.write_str(self.model.as_str())
        }
    }
}

/// One entry of a parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub types: &'static [ValueType],
}

impl Param {
    pub const fn new(name: &'static str, types: &'static [ValueType]) -> Self {
        assert!(!name.is_empty(), "parameter needs a name");
        assert!(!types.is_empty(), "parameter needs at least one allowed type");

        let mut accepts_list = false;
        let mut accepts_scalar = false;
        let mut i = 0;
        while i < types.len() {
            if matches!(types[i], ValueType::List) {
                accepts_list = true;
            } else {
                accepts_scalar = true;
            }
            i += 1;
        }
        assert!(
            !accepts_list || accepts_scalar,
            "list parameter must also name its element type"
        );

        Self { name, types }
    }

    pub fn accepts(&self, ty: ValueType) -> bool {
        self.types.contains(&ty)
    }

    /// Allowed types as a comma-separated list, for error messages.
    pub fn allowed(&self) -> String {
        self.types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Static description of one remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub name: &'static str,
    /// Path relative to the API root; may contain `{placeholder}` segments.
    pub path: &'static str,
    pub method: HttpMethod,
    pub params: &'static [Param],
    pub auth: AuthRequirement,
    pub response: ResponseShape,
    /// Set on the operation that issues API tokens. Such an operation never
    /// triggers a token fetch of its own.
    pub issues_token: bool,
}

impl Endpoint {
    pub const fn get(name: &'static str, path: &'static str) -> Self {
        Self::new(name, path, HttpMethod::Get)
    }

    pub const fn post(name: &'static str, path: &'static str) -> Self {
        Self::new(name, path, HttpMethod::Post)
    }

    pub const fn delete(name: &'static str, path: &'static str) -> Self {
        Self::new(name, path, HttpMethod::Delete)
    }

    const fn new(name: &'static str, path: &'static str, method: HttpMethod) -> Self {
        assert!(!name.is_empty(), "endpoint needs a name");
        assert!(!path.is_empty(), "endpoint needs a path");
        Self {
            name,
            path,
            method,
            params: &[],
            auth: AuthRequirement::None,
            response: ResponseShape::one(ModelKind::Json),
            issues_token: false,
        }
    }

    pub const fn params(mut self, params: &'static [Param]) -> Self {
        let mut i = 0;
        while i < params.len() {
            let mut j = i + 1;
            while j < params.len() {
                assert!(
                    !str_eq(params[i].name, params[j].name),
                    "duplicate parameter name in schema"
                );
                j += 1;
            }
            i += 1;
        }
        self.params = params;
        self
    }

    pub const fn auth(mut self, auth: AuthRequirement) -> Self {
        self.auth = auth;
        self
    }

    pub const fn returns(mut self, response: ResponseShape) -> Self {
        self.response = response;
        self
    }

    pub const fn issues_token(mut self) -> Self {
        self.issues_token = true;
        self
    }

    pub fn param(&self, name: &str) -> Option<&'static Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Names of the `{placeholder}` segments in the path template.
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> {
        let path: &'static str = self.path;
        path.split('/')
            .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}
