//! The method binder: runs one `Endpoint` against a client.
//!
//! # Design
//! There is no per-endpoint code. `invoke` takes a descriptor and the call's
//! `Args` and performs every step the same way for all endpoints:
//!
//! 1. credential precondition (`Authentication` before anything else),
//! 2. argument binding in schema order and type validation,
//! 3. auth resolution, including the nested token fetch,
//! 4. request assembly (path placeholders, query or form body, headers),
//! 5. transport dispatch and status check,
//! 6. parsing into the endpoint's response shape.
//!
//! Arguments are validated before the token fetch so that a bad call never
//! reaches the network. Each step fails with exactly one `ApiError`.

use base64::{engine::general_purpose::STANDARD, Engine};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, debug_span, warn};
use url::form_urlencoded;

use crate::client::PosterousClient;
use crate::endpoint::{AuthRequirement, Endpoint, Param};
use crate::error::{ApiError, ParseError, TransportError};
use crate::http::{HttpMethod, HttpRequest, Transport};
use crate::parser::{Parser, Payload};
use crate::value::{Args, Value, ValueType};

/// Characters left unescaped in a substituted path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// An endpoint bound to a client, ready to be called.
pub struct BoundOperation<'c, T, P> {
    client: &'c PosterousClient<T, P>,
    endpoint: &'static Endpoint,
}

impl<'c, T: Transport, P: Parser> BoundOperation<'c, T, P> {
    pub(crate) fn new(client: &'c PosterousClient<T, P>, endpoint: &'static Endpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &'static Endpoint {
        self.endpoint
    }

    pub fn call(&self, args: Args) -> Result<Payload, ApiError> {
        invoke(self.client, self.endpoint, args)
    }
}

/// Run `endpoint` with `args` against `client`.
pub(crate) fn invoke<T: Transport, P: Parser>(
    client: &PosterousClient<T, P>,
    endpoint: &'static Endpoint,
    args: Args,
) -> Result<Payload, ApiError> {
    let span = debug_span!("invoke", endpoint = endpoint.name, method = %endpoint.method);
    let _enter = span.enter();

    check_credentials(client, endpoint)?;
    let invocation = Invocation::bind(endpoint, args)?;
    let auth = resolve_auth(client, endpoint)?;
    let request = invocation.into_request(&client.config().api_url(), auth)?;
    dispatch(client, endpoint, &request)
}

/// How the outgoing request is authenticated.
enum Auth {
    None,
    /// Ready-made `Authorization` header value.
    Basic(String),
    Token(String),
}

fn check_credentials<T, P>(
    client: &PosterousClient<T, P>,
    endpoint: &'static Endpoint,
) -> Result<(), ApiError> {
    let has_credentials = client.config().basic_credentials().is_some();
    let satisfied = match endpoint.auth {
        AuthRequirement::None => true,
        AuthRequirement::Basic => has_credentials,
        AuthRequirement::Token if endpoint.issues_token => has_credentials,
        AuthRequirement::Token => has_credentials || client.cached_token().is_some(),
    };
    if satisfied {
        Ok(())
    } else {
        Err(ApiError::Authentication {
            endpoint: endpoint.name,
        })
    }
}

fn resolve_auth<T: Transport, P: Parser>(
    client: &PosterousClient<T, P>,
    endpoint: &'static Endpoint,
) -> Result<Auth, ApiError> {
    match endpoint.auth {
        AuthRequirement::None => Ok(Auth::None),
        AuthRequirement::Basic => basic_header(client, endpoint).map(Auth::Basic),
        // The issuing endpoint authenticates with credentials, never with a
        // token it has yet to hand out.
        AuthRequirement::Token if endpoint.issues_token => {
            basic_header(client, endpoint).map(Auth::Basic)
        }
        AuthRequirement::Token => client.ensure_token(endpoint).map(Auth::Token),
    }
}

fn basic_header<T, P>(
    client: &PosterousClient<T, P>,
    endpoint: &'static Endpoint,
) -> Result<String, ApiError> {
    let (user, pass) = client
        .config()
        .basic_credentials()
        .ok_or(ApiError::Authentication {
            endpoint: endpoint.name,
        })?;
    Ok(format!("Basic {}", STANDARD.encode(format!("{user}:{pass}"))))
}

fn dispatch<T: Transport, P: Parser>(
    client: &PosterousClient<T, P>,
    endpoint: &'static Endpoint,
    request: &HttpRequest,
) -> Result<Payload, ApiError> {
    debug!(url = %request.url, "dispatching request");
    let response = client.transport().send(request).inspect_err(|err| {
        warn!(error = %err, "transport failed");
    })?;

    if !response.is_success() {
        warn!(status = response.status, "service returned an error status");
        return Err(TransportError::Status {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }
        .into());
    }

    let payload = client.parser().parse(&response.body, endpoint.response)?;
    let is_list = matches!(payload, Payload::Many(_));
    if is_list != endpoint.response.list {
        return Err(ParseError::ShapeMismatch {
            expected: endpoint.response.to_string(),
            found: if is_list { "a list" } else { "a single object" }.to_string(),
        }
        .into());
    }
    Ok(payload)
}

/// Per-call state: bound arguments in schema order plus caller headers.
#[derive(Debug)]
pub(crate) struct Invocation {
    endpoint: &'static Endpoint,
    bound: Vec<(&'static str, Value)>,
    headers: Vec<(String, String)>,
}

impl Invocation {
    /// Merge positional and keyword arguments against the schema and check
    /// each value's type.
    pub(crate) fn bind(endpoint: &'static Endpoint, args: Args) -> Result<Self, ApiError> {
        let Args {
            positional,
            mut keyword,
            headers,
        } = args;

        for (i, (name, _)) in keyword.iter().enumerate() {
            if keyword[..i].iter().any(|(seen, _)| seen == name) {
                return Err(ApiError::DuplicateParameter { name: name.clone() });
            }
        }
        if let Some((name, _)) = keyword.iter().find(|(name, _)| endpoint.param(name).is_none()) {
            return Err(ApiError::UnknownParameter { name: name.clone() });
        }
        if positional.len() > endpoint.params.len() {
            return Err(ApiError::UnknownParameter {
                name: format!("positional argument #{}", endpoint.params.len() + 1),
            });
        }

        let mut positional = positional.into_iter();
        let mut bound = Vec::new();
        for param in endpoint.params {
            let by_position = positional.next().flatten();
            let by_keyword = keyword
                .iter()
                .position(|(name, _)| name == param.name)
                .map(|i| keyword.remove(i).1);

            let value = match (by_position, by_keyword) {
                (Some(_), Some(_)) => {
                    return Err(ApiError::DuplicateParameter {
                        name: param.name.to_string(),
                    })
                }
                (Some(value), None) | (None, Some(value)) => value,
                (None, None) => continue,
            };
            check_type(param, &value)?;
            bound.push((param.name, value));
        }

        Ok(Self {
            endpoint,
            bound,
            headers,
        })
    }

    /// Encoded `(key, value)` pairs for every bound argument, in order.
    pub(crate) fn encoded_params(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (name, value) in &self.bound {
            value.encode_into(name, &mut out);
        }
        out
    }

    fn into_request(mut self, api_url: &str, auth: Auth) -> Result<HttpRequest, ApiError> {
        let path = self.expand_path()?;
        let params = self.encoded_params();
        let mut url = format!("{api_url}/{path}");

        let auth_header = match auth {
            Auth::None => None,
            Auth::Basic(value) => Some(("authorization", value)),
            Auth::Token(token) => Some(("api_token", token)),
        };
        let mut headers = Vec::new();
        if let Some((name, value)) = &auth_header {
            headers.push((name.to_string(), value.clone()));
        }

        let body = match self.endpoint.method {
            HttpMethod::Post => {
                headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
                Some(form_encode(&params))
            }
            HttpMethod::Get | HttpMethod::Delete => {
                if !params.is_empty() {
                    url.push('?');
                    url.push_str(&form_encode(&params));
                }
                None
            }
        };
        // The binder's credentials replace any caller header of the same name.
        headers.extend(self.headers.into_iter().filter(|(name, _)| {
            auth_header
                .as_ref()
                .map_or(true, |(auth, _)| !name.eq_ignore_ascii_case(auth))
        }));

        Ok(HttpRequest {
            method: self.endpoint.method,
            url,
            headers,
            body,
        })
    }

    /// Substitute `{placeholder}` segments, consuming the bound values they use.
    fn expand_path(&mut self) -> Result<String, ApiError> {
        let mut segments = Vec::new();
        for segment in self.endpoint.path.split('/') {
            let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
                segments.push(segment.to_string());
                continue;
            };
            let index = self
                .bound
                .iter()
                .position(|(bound, _)| *bound == name)
                .ok_or_else(|| ApiError::MissingPathParameter {
                    endpoint: self.endpoint.name,
                    name: name.to_string(),
                })?;
            let (_, value) = self.bound.remove(index);
            let text = value
                .scalar_text()
                .ok_or_else(|| ApiError::InvalidParameterType {
                    name: name.to_string(),
                    value: value.to_string(),
                    allowed: "a single value in a path segment".to_string(),
                })?;
            segments.push(utf8_percent_encode(&text, PATH_SEGMENT).to_string());
        }
        Ok(segments.join("/"))
    }
}

fn check_type(param: &Param, value: &Value) -> Result<(), ApiError> {
    let valid = param.accepts(value.value_type())
        && match value {
            Value::List(items) => items.iter().all(|item| {
                item.value_type() != ValueType::List && param.accepts(item.value_type())
            }),
            _ => true,
        };
    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidParameterType {
            name: param.name.to_string(),
            value: value.to_string(),
            allowed: param.allowed(),
        })
    }
}

fn form_encode(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}
