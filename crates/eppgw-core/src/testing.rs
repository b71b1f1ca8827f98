//! Test support: an in-memory descriptor pool for a small EPP service.
//!
//! Unit and integration tests need a schema to resolve routes against
//! without shipping a compiled descriptor artifact, so this module builds
//! a `FileDescriptorSet` for a representative `epp.EppGateway` service
//! programmatically. Production deployments load their descriptor set
//! from disk instead (see `schema::load_descriptor_pool`).

use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};

fn scalar_field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn repeated_field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..scalar_field(name, number, ty)
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::Message as i32),
        type_name: Some(type_name.to_string()),
        ..Default::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

/// A pool defining `epp.EppGateway` with DomainCheck, DomainInfo,
/// DomainCreate and DomainTransfer.
pub fn demo_pool() -> DescriptorPool {
    let file = FileDescriptorProto {
        name: Some("epp.proto".to_string()),
        package: Some("epp".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message(
                "DomainCheckRequest",
                vec![scalar_field("name", 1, Type::String)],
            ),
            message(
                "DomainCheckReply",
                vec![
                    scalar_field("available", 1, Type::Bool),
                    scalar_field("reason", 2, Type::String),
                ],
            ),
            message(
                "DomainInfoRequest",
                vec![scalar_field("name", 1, Type::String)],
            ),
            message(
                "Domain",
                vec![
                    scalar_field("name", 1, Type::String),
                    scalar_field("registry_id", 2, Type::String),
                    repeated_field("statuses", 3, Type::String),
                ],
            ),
            message(
                "DomainInfoReply",
                vec![message_field("domain", 1, ".epp.Domain")],
            ),
            message("AuthInfo", vec![scalar_field("password", 1, Type::String)]),
            message(
                "DomainCreateRequest",
                vec![
                    scalar_field("name", 1, Type::String),
                    scalar_field("period", 2, Type::Int32),
                    scalar_field("registrant", 3, Type::String),
                    repeated_field("nameservers", 4, Type::String),
                ],
            ),
            message(
                "DomainCreateReply",
                vec![
                    scalar_field("pending", 1, Type::Bool),
                    scalar_field("creation_date", 2, Type::String),
                ],
            ),
            message(
                "DomainTransferRequest",
                vec![
                    scalar_field("name", 1, Type::String),
                    scalar_field("period", 2, Type::Int32),
                    message_field("auth_info", 3, ".epp.AuthInfo"),
                ],
            ),
            message(
                "DomainTransferReply",
                vec![
                    scalar_field("status", 1, Type::String),
                    scalar_field("expiry_date", 2, Type::String),
                ],
            ),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("EppGateway".to_string()),
            method: vec![
                method("DomainCheck", ".epp.DomainCheckRequest", ".epp.DomainCheckReply"),
                method("DomainInfo", ".epp.DomainInfoRequest", ".epp.DomainInfoReply"),
                method(
                    "DomainCreate",
                    ".epp.DomainCreateRequest",
                    ".epp.DomainCreateReply",
                ),
                method(
                    "DomainTransfer",
                    ".epp.DomainTransferRequest",
                    ".epp.DomainTransferReply",
                ),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
        .expect("demo descriptor set is valid")
}
