//! Protobuf schema loading and method resolution.
//!
//! The gateway is generic over the backend's message types: the schema is
//! a serialized `FileDescriptorSet` (produced out-of-band, e.g. with
//! `protoc --descriptor_set_out`) loaded once at startup into a
//! `DescriptorPool`. Routes resolve their RPC method names against the
//! pool, and the binding/rendering code walks message descriptors from it.

use std::fs;
use std::path::Path;

use prost_reflect::{DescriptorPool, FieldDescriptor, Kind, MessageDescriptor, MethodDescriptor};

use crate::error::ConfigError;

/// Load a descriptor pool from a serialized `FileDescriptorSet` file.
pub fn load_descriptor_pool(path: &Path) -> Result<DescriptorPool, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    DescriptorPool::decode(bytes.as_slice())
        .map_err(|e| ConfigError::InvalidDescriptorSet(e.to_string()))
}

/// Resolve `"pkg.Service.Method"` (or `"pkg.Service/Method"`) to its
/// descriptor.
pub fn resolve_method(pool: &DescriptorPool, name: &str) -> Result<MethodDescriptor, ConfigError> {
    let (service_name, method_name) = name
        .rsplit_once('/')
        .or_else(|| name.rsplit_once('.'))
        .ok_or_else(|| ConfigError::UnknownRpcMethod(name.to_string()))?;

    let service = pool
        .get_service_by_name(service_name)
        .ok_or_else(|| ConfigError::UnknownRpcMethod(name.to_string()))?;

    let method = service
        .methods()
        .find(|m| m.name() == method_name)
        .ok_or_else(|| ConfigError::UnknownRpcMethod(name.to_string()));
    method
}

/// The gRPC request path for a method: `/pkg.Service/Method`.
pub fn grpc_path(method: &MethodDescriptor) -> String {
    format!(
        "/{}/{}",
        method.parent_service().full_name(),
        method.name()
    )
}

/// Walk a dotted field path (`"auth_info.password"`) down a message
/// descriptor, returning the leaf field. `None` if any step is missing or
/// descends through a non-message field.
pub fn field_at_path(message: &MessageDescriptor, path: &str) -> Option<FieldDescriptor> {
    let mut current = message.clone();
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let field = current.get_field_by_name(segment)?;
        if segments.peek().is_none() {
            return Some(field);
        }
        match field.kind() {
            Kind::Message(inner) => current = inner,
            _ => return None,
        }
    }
    None
}
