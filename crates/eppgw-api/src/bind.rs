//! HTTP request binding: body, path parameters and query parameters are
//! merged into one JSON object and deserialized into the RPC request
//! message.
//!
//! Precedence follows `google.api.http`: the body populates the message
//! first (wholly, or into one field), path parameters overwrite it, and
//! query parameters fill in fields not already bound. All of this happens
//! before dispatch, so a malformed request never reaches the backend.

use prost_reflect::{DeserializeOptions, DynamicMessage, FieldDescriptor, Kind};
use serde_json::{Map, Value};

use eppgw_core::{schema, BodyBinding, Route, RpcError};

/// Bind one HTTP request to the route's RPC request message.
///
/// `path_params` are the decoded `{param}` captures in route order. Every
/// failure is `invalid-argument` and renders as 400.
pub fn bind_request(
    route: &Route,
    path_params: &[(&str, &str)],
    query: Option<&str>,
    body: &[u8],
    strict: bool,
) -> Result<DynamicMessage, RpcError> {
    let input = route.input();

    let mut root = match route.body() {
        // Bodies on body-less routes are ignored, not rejected.
        BodyBinding::None => Map::new(),
        BodyBinding::Whole => match parse_body(body)? {
            Value::Object(map) => map,
            _ => {
                return Err(RpcError::invalid_argument(
                    "request body must be a JSON object",
                ))
            }
        },
        BodyBinding::Field(path) => {
            let value = parse_body(body)?;
            let mut map = Map::new();
            insert_at_path(&mut map, path, value)?;
            map
        }
    };

    for (name, raw) in path_params {
        // The route table validated these names at startup.
        let field = schema::field_at_path(&input, name).ok_or_else(|| {
            RpcError::internal(format!("path parameter {name} names no request field"))
        })?;
        let value = convert_scalar(&field, name, raw)?;
        insert_at_path(&mut root, name, value)?;
    }

    if let Some(query) = query {
        bind_query(route, &mut root, query, strict)?;
    }

    let options = DeserializeOptions::new().deny_unknown_fields(strict);
    DynamicMessage::deserialize_with_options(input, Value::Object(root), &options)
        .map_err(|e| RpcError::invalid_argument(format!("invalid request: {e}")))
}

fn parse_body(body: &[u8]) -> Result<Value, RpcError> {
    if body.is_empty() {
        return Err(RpcError::invalid_argument("request body is required"));
    }
    serde_json::from_slice(body)
        .map_err(|e| RpcError::invalid_argument(format!("request body is not valid JSON: {e}")))
}

/// Bind residual query parameters to request fields by (dotted) name.
///
/// Keys already bound by the path or the body are skipped; the earlier
/// binding wins. Unknown keys are ignored unless `strict`.
fn bind_query(
    route: &Route,
    root: &mut Map<String, Value>,
    query: &str,
    strict: bool,
) -> Result<(), RpcError> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => grouped.push((key.into_owned(), vec![value.into_owned()])),
        }
    }

    for (key, values) in grouped {
        if route.path_params().iter().any(|p| *p == key) || value_at_path(root, &key).is_some() {
            continue;
        }

        let Some(field) = schema::field_at_path(&route.input(), &key) else {
            if strict {
                return Err(RpcError::invalid_argument(format!(
                    "unknown query parameter {key:?}"
                )));
            }
            continue;
        };

        let value = if field.is_list() {
            let mut items = Vec::with_capacity(values.len());
            for raw in &values {
                items.push(convert_scalar(&field, &key, raw)?);
            }
            Value::Array(items)
        } else if values.len() > 1 {
            return Err(RpcError::invalid_argument(format!(
                "query parameter {key:?} given {} times for a singular field",
                values.len()
            )));
        } else {
            convert_scalar(&field, &key, &values[0])?
        };

        insert_at_path(root, &key, value)?;
    }

    Ok(())
}

/// Convert one string value to the JSON shape the field deserializes from.
fn convert_scalar(field: &FieldDescriptor, name: &str, raw: &str) -> Result<Value, RpcError> {
    let invalid = || RpcError::invalid_argument(format!("invalid value for {name}: {raw:?}"));

    let value = match field.kind() {
        Kind::String => Value::String(raw.to_string()),
        Kind::Bool => Value::Bool(raw.parse().map_err(|_| invalid())?),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            Value::from(raw.parse::<i32>().map_err(|_| invalid())?)
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            Value::from(raw.parse::<i64>().map_err(|_| invalid())?)
        }
        Kind::Uint32 | Kind::Fixed32 => Value::from(raw.parse::<u32>().map_err(|_| invalid())?),
        Kind::Uint64 | Kind::Fixed64 => Value::from(raw.parse::<u64>().map_err(|_| invalid())?),
        Kind::Float | Kind::Double => {
            let number = raw.parse::<f64>().map_err(|_| invalid())?;
            // "NaN" and "Infinity" survive as the proto3 JSON strings.
            serde_json::Number::from_f64(number)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string()))
        }
        // Enums accept either the value name or the number.
        Kind::Enum(_) => match raw.parse::<i64>() {
            Ok(number) => Value::from(number),
            Err(_) => Value::String(raw.to_string()),
        },
        // Base64; the deserializer validates it.
        Kind::Bytes => Value::String(raw.to_string()),
        Kind::Message(_) => {
            return Err(RpcError::invalid_argument(format!(
                "{name} does not name a scalar field"
            )))
        }
    };
    Ok(value)
}

/// Set `root[path] = value`, creating intermediate objects for dotted
/// paths.
fn insert_at_path(
    root: &mut Map<String, Value>,
    path: &str,
    value: Value,
) -> Result<(), RpcError> {
    let mut current = root;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return Ok(());
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = entry.as_object_mut().ok_or_else(|| {
            RpcError::invalid_argument(format!(
                "{path} conflicts with a non-object value in the request body"
            ))
        })?;
    }
    Ok(())
}

fn value_at_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
