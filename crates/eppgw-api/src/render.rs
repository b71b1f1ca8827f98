//! Response rendering: the RPC reply message becomes the JSON response
//! body, optionally projected down to one field via `response_body`.

use prost_reflect::{DynamicMessage, SerializeOptions};
use serde_json::Value;

use eppgw_core::{Route, RpcError};

/// Render the backend reply as the HTTP response body.
///
/// Field names are the proto names, matching what the route table and the
/// binding layer use. Fields at their default value are omitted, per the
/// proto3 JSON convention.
pub fn render_response(route: &Route, reply: &DynamicMessage) -> Result<Value, RpcError> {
    let options = SerializeOptions::new().use_proto_field_name(true);
    let value = reply
        .serialize_with_options(serde_json::value::Serializer, &options)
        .map_err(|e| RpcError::internal(format!("failed to render backend reply: {e}")))?;

    Ok(match route.response_body() {
        Some(path) => project(value, path),
        None => value,
    })
}

/// Extract the (dotted) `response_body` field; an absent field renders as
/// null, same as a field the backend left at its default.
fn project(value: Value, path: &str) -> Value {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(mut map) => map.remove(segment).unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use eppgw_core::testing::demo_pool;
    use eppgw_core::RouteTable;
    use prost_reflect::Value as ProstValue;
    use serde_json::json;

    fn table() -> RouteTable {
        RouteTable::from_toml(
            r#"
            [[routes]]
            method = "GET"
            path = "/epp/v1/domains/{name}/check"
            rpc = "epp.EppGateway.DomainCheck"

            [[routes]]
            method = "GET"
            path = "/epp/v1/domains/{name}"
            rpc = "epp.EppGateway.DomainInfo"
            response_body = "domain"
            "#,
            &demo_pool(),
        )
        .unwrap()
    }

    #[test]
    fn renders_proto_field_names() {
        let table = table();
        let route = &table.routes()[0];

        let mut reply = DynamicMessage::new(route.output());
        reply.set_field_by_name("available", ProstValue::Bool(true));
        reply.set_field_by_name("reason", ProstValue::String("premium tier".into()));

        let value = render_response(route, &reply).unwrap();
        assert_eq!(value, json!({"available": true, "reason": "premium tier"}));
    }

    #[test]
    fn default_fields_are_omitted() {
        let table = table();
        let route = &table.routes()[0];

        let reply = DynamicMessage::new(route.output());
        let value = render_response(route, &reply).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn response_body_projects_one_field() {
        let table = table();
        let route = &table.routes()[1];

        let pool = demo_pool();
        let domain_desc = pool.get_message_by_name("epp.Domain").unwrap();
        let mut domain = DynamicMessage::new(domain_desc);
        domain.set_field_by_name("name", ProstValue::String("example.com".into()));

        let mut reply = DynamicMessage::new(route.output());
        reply.set_field_by_name("domain", ProstValue::Message(domain));

        let value = render_response(route, &reply).unwrap();
        assert_eq!(value, json!({"name": "example.com"}));
    }

    #[test]
    fn absent_projected_field_renders_null() {
        let table = table();
        let route = &table.routes()[1];

        let reply = DynamicMessage::new(route.output());
        let value = render_response(route, &reply).unwrap();
        assert_eq!(value, Value::Null);
    }
}
