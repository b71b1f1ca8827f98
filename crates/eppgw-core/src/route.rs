//! Declarative route table.
//!
//! Routes are data, not code: a TOML artifact lists `(HTTP method, path
//! pattern, RPC method, field bindings)` entries, loaded once at startup
//! and resolved against the descriptor pool. The transcoding router is
//! fully generic over this table.
//!
//! ```toml
//! [[routes]]
//! method = "GET"
//! path = "/epp/v1/domains/{name}/check"
//! rpc = "epp.EppGateway.DomainCheck"
//!
//! [[routes]]
//! method = "POST"
//! path = "/epp/v1/domains/{name}/transfer"
//! rpc = "epp.EppGateway.DomainTransfer"
//! body = "auth_info"
//! ```
//!
//! Binding semantics follow `google.api.http`: path parameters bind to
//! same-named (dotted) request fields, the body binds to the whole request
//! message (`"*"`), one field, or nothing, and leftover query parameters
//! bind to request fields by name. `response_body` optionally projects
//! one field of the response message instead of the whole message.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use http::Method;
use prost_reflect::{DescriptorPool, Kind, MessageDescriptor, MethodDescriptor};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::schema;

/// Top-level structure of the route table file.
#[derive(Debug, Deserialize)]
pub struct RouteFile {
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

/// One unresolved route entry as written in the table file.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    pub method: String,
    pub path: String,
    pub rpc: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub response_body: Option<String>,
}

/// How the HTTP request body populates the RPC request message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyBinding {
    /// No body binding; any request body is ignored
    None,
    /// The JSON body is the whole request message (`body = "*"`)
    Whole,
    /// The JSON body populates one (dotted) field (`body = "auth_info"`)
    Field(String),
}

/// One immutable, resolved route.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    pattern: String,
    path_params: Vec<String>,
    rpc: MethodDescriptor,
    body: BodyBinding,
    response_body: Option<String>,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The axum-style path pattern, e.g. `/epp/v1/domains/{name}/check`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Names of the `{param}` segments, in order of appearance.
    pub fn path_params(&self) -> &[String] {
        &self.path_params
    }

    pub fn rpc(&self) -> &MethodDescriptor {
        &self.rpc
    }

    /// Descriptor of the RPC request message.
    pub fn input(&self) -> MessageDescriptor {
        self.rpc.input()
    }

    /// Descriptor of the RPC response message.
    pub fn output(&self) -> MessageDescriptor {
        self.rpc.output()
    }

    pub fn body(&self) -> &BodyBinding {
        &self.body
    }

    pub fn response_body(&self) -> Option<&str> {
        self.response_body.as_deref()
    }
}

/// The immutable, startup-built route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Load and resolve a route table from a TOML file.
    pub fn load(path: &Path, pool: &DescriptorPool) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text, pool)
    }

    /// Parse and resolve a route table from TOML text.
    pub fn from_toml(text: &str, pool: &DescriptorPool) -> Result<Self, ConfigError> {
        let file: RouteFile = toml::from_str(text)?;
        Self::from_specs(file.routes, pool)
    }

    /// Resolve route specs against the descriptor pool, validating every
    /// field reference and rejecting duplicate `(method, pattern)` pairs.
    pub fn from_specs(specs: Vec<RouteSpec>, pool: &DescriptorPool) -> Result<Self, ConfigError> {
        let mut routes = Vec::with_capacity(specs.len());
        let mut seen: HashSet<(Method, String)> = HashSet::new();

        for spec in specs {
            let route = resolve_route(&spec, pool)?;

            // Parameter names do not affect matching, so normalize them
            // away before checking uniqueness.
            let key = (route.method.clone(), normalize_pattern(&route.pattern));
            if !seen.insert(key) {
                return Err(ConfigError::DuplicateRoute {
                    method: spec.method,
                    path: spec.path,
                });
            }
            routes.push(Arc::new(route));
        }

        Ok(Self { routes })
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn resolve_route(spec: &RouteSpec, pool: &DescriptorPool) -> Result<Route, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidRoute {
        method: spec.method.clone(),
        path: spec.path.clone(),
        reason,
    };

    let method = parse_method(&spec.method)
        .ok_or_else(|| invalid(format!("unsupported HTTP method {:?}", spec.method)))?;

    let path_params = parse_pattern(&spec.path).map_err(invalid)?;

    let rpc = schema::resolve_method(pool, &spec.rpc)?;
    let input = rpc.input();

    // Every binding the table names must exist in the schema. Catching
    // this at startup keeps bad tables a fatal ConfigError instead of a
    // per-request surprise.
    for param in &path_params {
        let field = schema::field_at_path(&input, param)
            .ok_or_else(|| invalid(format!("path parameter {{{param}}} does not name a field of {}", input.full_name())))?;
        if matches!(field.kind(), Kind::Message(_)) {
            return Err(invalid(format!(
                "path parameter {{{param}}} binds to a message field, expected a scalar"
            )));
        }
    }

    let body = match spec.body.as_deref() {
        None => BodyBinding::None,
        Some("*") => BodyBinding::Whole,
        Some("") => return Err(invalid("body binding must be \"*\" or a field path".into())),
        Some(field_path) => {
            schema::field_at_path(&input, field_path).ok_or_else(|| {
                invalid(format!(
                    "body binding {field_path:?} does not name a field of {}",
                    input.full_name()
                ))
            })?;
            BodyBinding::Field(field_path.to_string())
        }
    };

    if let Some(field_path) = spec.response_body.as_deref() {
        let output = rpc.output();
        schema::field_at_path(&output, field_path).ok_or_else(|| {
            invalid(format!(
                "response_body {field_path:?} does not name a field of {}",
                output.full_name()
            ))
        })?;
    }

    Ok(Route {
        method,
        pattern: spec.path.clone(),
        path_params,
        rpc,
        body,
        response_body: spec.response_body.clone(),
    })
}

fn parse_method(name: &str) -> Option<Method> {
    match name.to_ascii_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

/// Validate a path pattern and collect its `{param}` names.
fn parse_pattern(pattern: &str) -> Result<Vec<String>, String> {
    if !pattern.starts_with('/') {
        return Err("path pattern must start with '/'".into());
    }
    if pattern.len() > 1 && pattern.ends_with('/') {
        return Err("path pattern must not end with '/'".into());
    }

    let mut params = Vec::new();
    for segment in pattern[1..].split('/') {
        if segment.is_empty() {
            return Err("path pattern contains an empty segment".into());
        }
        if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            {
                return Err(format!("invalid path parameter segment {segment:?}"));
            }
            if params.iter().any(|p| p == name) {
                return Err(format!("path parameter {{{name}}} appears twice"));
            }
            params.push(name.to_string());
        } else if segment.contains('{') || segment.contains('}') {
            return Err(format!("malformed segment {segment:?}"));
        }
    }
    Ok(params)
}

/// Replace parameter names with a placeholder so patterns that match the
/// same requests compare equal.
fn normalize_pattern(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
