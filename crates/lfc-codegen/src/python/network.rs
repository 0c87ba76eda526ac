//! Values crossing a federate boundary.
//!
//! The generator only emits the call sites: the sending reaction serializes
//! right before the network send, the receiving reaction deserializes
//! right after receipt. The serializers themselves live in the runtime.

use std::path::Path;

use log::debug;
use serde::Serialize;

use lfc_config::CoordinationType;
use lfc_types::model::{FederateInstance, NetworkConnection, Program, SerializerTag};
use lfc_types::ErrorCode;

use crate::context::GenContext;
use crate::error::{CodegenError, CodegenResult};

/// Tool compiling `.proto` files to Python modules.
pub const PROTOC: &str = "protoc";
/// Installed alongside the extension when protocol buffers are in use.
pub const PROTO_PYTHON_REQUIREMENT: &str = "google-api-python-client";

// ══════════════════════════════════════════════════════════════════════════════
// Serializer selection
// ══════════════════════════════════════════════════════════════════════════════

fn endpoint(program: &Program, conn: &NetworkConnection, sending: bool) -> String {
    let (fed, port) = if sending {
        (conn.sending_federate, &conn.sending_port)
    } else {
        (conn.receiving_federate, &conn.receiving_port)
    };
    format!("{}.{}", program.federate(fed).name, port.to_source())
}

/// Module name a `.proto` file compiles to, without the `_pb2` suffix.
pub fn proto_root(file: &str) -> &str {
    let name = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// The serializer `conn` uses. Connections without a tag send pickled
/// values; a serializer without support in this configuration is fatal.
pub fn resolve_serializer(
    ctx: &GenContext<'_>,
    program: &Program,
    conn: &NetworkConnection,
) -> CodegenResult<SerializerTag> {
    let tag = conn.serializer.unwrap_or(SerializerTag::Native);
    let supported = match tag {
        SerializerTag::Native => true,
        SerializerTag::Proto => !ctx.config.proto_files.is_empty(),
        SerializerTag::Ros2 => false,
    };
    if supported {
        Ok(tag)
    } else {
        Err(CodegenError::MissingSerializer {
            serializer: tag,
            from: endpoint(program, conn, true),
            to: endpoint(program, conn, false),
        })
    }
}

/// Connections `federate` sends or receives on.
fn federate_connections<'p>(
    program: &'p Program,
    federate: &'p FederateInstance,
) -> impl Iterator<Item = &'p NetworkConnection> + 'p {
    program
        .network_connections
        .iter()
        .filter(move |c| c.sending_federate == federate.id || c.receiving_federate == federate.id)
}

// ══════════════════════════════════════════════════════════════════════════════
// Support code
// ══════════════════════════════════════════════════════════════════════════════

/// What enabling the serializers of one federate adds to its artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SerializationSupport {
    pub enabled: Vec<SerializerTag>,
    pub c_preamble: Vec<String>,
    pub python_preamble: Vec<String>,
    /// Commands to run before building the extension.
    pub pre_build: Vec<Vec<String>>,
    pub install_requires: Vec<String>,
}

/// Enable every serializer `federate` needs. Each serializer is switched
/// on independently: native when a connection uses it, proto whenever
/// `.proto` files are configured.
pub fn enable_serializers(
    ctx: &mut GenContext<'_>,
    program: &Program,
    federate: &FederateInstance,
) -> CodegenResult<SerializationSupport> {
    let mut support = SerializationSupport::default();
    for conn in federate_connections(program, federate) {
        let tag = resolve_serializer(ctx, program, conn)?;
        if !support.enabled.contains(&tag) {
            support.enabled.push(tag);
        }
    }
    if !ctx.config.proto_files.is_empty() && !support.enabled.contains(&SerializerTag::Proto) {
        support.enabled.push(SerializerTag::Proto);
    }
    support.enabled.sort();

    if support.enabled.contains(&SerializerTag::Native) {
        support.c_preamble.push("// Values crossing a federate boundary are pickled.".to_string());
        support.c_preamble.push("#define PYTHON_NATIVE_SERIALIZATION".to_string());
    }

    if support.enabled.contains(&SerializerTag::Proto) {
        let protoc = ctx.tools.find(PROTOC);
        if protoc.is_none() {
            ctx.degrade(
                ErrorCode::MISSING_TOOL,
                PROTOC,
                "Processing .proto files requires libprotoc >= 3.6.1",
            );
        }
        for file in &ctx.config.proto_files {
            let root = proto_root(file);
            support.python_preamble.push(format!("import {root}_pb2 as {root}"));
            if let Some(protoc) = &protoc {
                let input = match &ctx.source_dir {
                    Some(dir) => dir.join(file).display().to_string(),
                    None => file.clone(),
                };
                debug!("scheduling protoc for {input}");
                support.pre_build.push(vec![
                    protoc.display().to_string(),
                    "--python_out=.".to_string(),
                    input,
                ]);
            }
        }
        if protoc.is_some() {
            support.install_requires.push(PROTO_PYTHON_REQUIREMENT.to_string());
        }
    }
    Ok(support)
}

// ══════════════════════════════════════════════════════════════════════════════
// Sender / receiver bodies
// ══════════════════════════════════════════════════════════════════════════════

fn route_comment(program: &Program, conn: &NetworkConnection, verb: &str) -> String {
    format!(
        "// {verb} from {} in federate {} to {} in federate {}",
        conn.sending_port.to_source(),
        program.federate(conn.sending_federate).name,
        conn.receiving_port.to_source(),
        program.federate(conn.receiving_federate).name,
    )
}

/// Proto class named by the connection's type: `root.Type`, or `Type` in
/// the first configured module.
fn proto_class<'c>(ctx: &'c GenContext<'_>, conn: &'c NetworkConnection) -> (String, &'c str) {
    let type_name = conn.type_name.as_deref().unwrap_or("Message");
    match type_name.rsplit_once('.') {
        Some((module, class)) => (module.to_string(), class),
        None => {
            let module = ctx
                .config
                .proto_files
                .first()
                .map(|f| proto_root(f).to_string())
                .unwrap_or_default();
            (module, type_name)
        }
    }
}

/// Reaction body sending the value of `conn`'s port to the receiving
/// federate.
pub fn generate_sender_body(
    ctx: &GenContext<'_>,
    program: &Program,
    conn: &NetworkConnection,
) -> CodegenResult<String> {
    let serializer = resolve_serializer(ctx, program, conn)?;
    let port = conn.sending_port.to_ident();
    let receiver = conn.receiving_federate.0;
    let mut lines = vec![
        route_comment(program, conn, "Sending"),
        format!("if (!{port}->is_present) {{"),
        "    return;".to_string(),
        "}".to_string(),
        "PyGILState_STATE gstate;".to_string(),
        "gstate = PyGILState_Ensure();".to_string(),
    ];
    lines.push(match serializer {
        SerializerTag::Proto => format!(
            "PyObject* serialized_pyobject = PyObject_CallMethod({port}->value, \"SerializeToString\", NULL);"
        ),
        _ => format!(
            "PyObject* serialized_pyobject = PyObject_CallMethod(global_pickler, \"dumps\", \"O\", {port}->value);"
        ),
    });
    lines.extend(
        [
            "if (serialized_pyobject == NULL) {",
            "    if (PyErr_Occurred()) PyErr_Print();",
            "    error_print_and_exit(\"Could not serialize serialized_pyobject.\");",
            "}",
            "Py_buffer serialized_pyobject_buffer;",
            "int returnValue = PyObject_GetBuffer(serialized_pyobject, &serialized_pyobject_buffer, PyBUF_SIMPLE);",
            "if (returnValue == -1) {",
            "    if (PyErr_Occurred()) PyErr_Print();",
            "    error_print_and_exit(\"Could not serialize serialized_pyobject.\");",
            "}",
            "size_t message_length = serialized_pyobject_buffer.len;",
        ]
        .map(String::from),
    );

    let delay = conn
        .delay
        .map_or_else(|| "NEVER".to_string(), |d| d.to_runtime_expr());
    let payload = "message_length, (unsigned char*)serialized_pyobject_buffer.buf";
    let port_id = conn.receiving_port_id;
    lines.push(if conn.is_physical {
        format!(
            "send_message(MSG_TYPE_P2P_MESSAGE, {port_id}, {receiver}, \"federate {receiver}\", {payload});"
        )
    } else {
        match ctx.config.coordination {
            CoordinationType::Decentralized => format!(
                "send_timed_message({delay}, MSG_TYPE_P2P_TAGGED_MESSAGE, {port_id}, {receiver}, \"federate {receiver}\", {payload});"
            ),
            CoordinationType::Centralized => format!(
                "send_timed_message({delay}, MSG_TYPE_TAGGED_MESSAGE, {port_id}, {receiver}, \"federate {receiver} via the RTI\", {payload});"
            ),
        }
    });
    lines.extend(
        [
            "PyBuffer_Release(&serialized_pyobject_buffer);",
            "Py_XDECREF(serialized_pyobject);",
            "/* Release the thread. No Python API allowed beyond this point. */",
            "PyGILState_Release(gstate);",
        ]
        .map(String::from),
    );
    Ok(lines.join("\n"))
}

/// Reaction body decoding a received message and setting the destination
/// port.
pub fn generate_receiver_body(
    ctx: &GenContext<'_>,
    program: &Program,
    conn: &NetworkConnection,
) -> CodegenResult<String> {
    let serializer = resolve_serializer(ctx, program, conn)?;
    let action = &conn.receiving_action;
    let port = conn.receiving_port.to_ident();
    let mut lines = vec![
        route_comment(program, conn, "Receiving"),
        "PyGILState_STATE gstate;".to_string(),
        "gstate = PyGILState_Ensure();".to_string(),
        format!(
            "PyObject* message_byte_array = PyBytes_FromStringAndSize((char*){action}->token->value, {action}->token->length);"
        ),
    ];
    match serializer {
        SerializerTag::Proto => {
            let (module, class) = proto_class(ctx, conn);
            lines.push(format!(
                "PyObject* proto_module = PyImport_ImportModule(\"{module}_pb2\");"
            ));
            lines.push(format!(
                "PyObject* proto_class = PyObject_GetAttrString(proto_module, \"{class}\");"
            ));
            lines.push(
                "PyObject* deserialized_message = PyObject_CallMethod(proto_class, \"FromString\", \"O\", message_byte_array);"
                    .to_string(),
            );
        }
        _ => lines.push(
            "PyObject* deserialized_message = PyObject_CallMethod(global_pickler, \"loads\", \"O\", message_byte_array);"
                .to_string(),
        ),
    }
    lines.extend(
        [
            "if (deserialized_message == NULL) {",
            "    if (PyErr_Occurred()) PyErr_Print();",
            "    error_print_and_exit(\"Could not deserialize deserialized_message.\");",
            "}",
            "Py_XDECREF(message_byte_array);",
        ]
        .map(String::from),
    );
    lines.push(format!("SET({port}, deserialized_message);"));
    lines.push("/* Release the thread. No Python API allowed beyond this point. */".to_string());
    lines.push("PyGILState_Release(gstate);".to_string());
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FixedTools;
    use lfc_config::{Target, TargetConfig};
    use lfc_types::model::{ClassId, FederateId, ReactorClass, ReactorTree, VarRef};
    use lfc_types::TimeValue;

    fn federated(serializer: Option<SerializerTag>) -> Program {
        let mut main = ReactorClass::new("Main");
        main.is_main = true;
        main.is_federated = true;
        let mut tree = ReactorTree::new("Main", ClassId(0));
        let src = tree.add_child(tree.root(), "src", ClassId(0));
        let dst = tree.add_child(tree.root(), "dst", ClassId(0));
        Program {
            name: "Fed".into(),
            target: "Python".into(),
            properties: Vec::new(),
            preambles: Vec::new(),
            classes: vec![main],
            tree,
            federates: vec![
                FederateInstance::new(0, "src", vec![src]),
                FederateInstance::new(1, "dst", vec![dst]),
            ],
            network_connections: vec![NetworkConnection {
                sending_federate: FederateId(0),
                sending_port: VarRef::contained("src", "out"),
                receiving_federate: FederateId(1),
                receiving_port: VarRef::contained("dst", "inp"),
                receiving_port_id: 0,
                receiving_action: "networkMessage_0".into(),
                type_name: None,
                is_physical: false,
                delay: Some(TimeValue::msec(5)),
                serializer,
            }],
        }
    }

    #[test]
    fn proto_roots() {
        assert_eq!(proto_root("ProtoHelloWorld.proto"), "ProtoHelloWorld");
        assert_eq!(proto_root("protos/person.proto"), "person");
        assert_eq!(proto_root("noext"), "noext");
    }

    #[test]
    fn centralized_sender_goes_through_the_rti() {
        let p = federated(None);
        let config = TargetConfig::new(Target::Python);
        let tools = FixedTools::none();
        let ctx = GenContext::new(&config, &tools);
        let body = generate_sender_body(&ctx, &p, &p.network_connections[0]).unwrap();
        assert!(body.starts_with("// Sending from src.out in federate src to dst.inp in federate dst"));
        assert!(body.contains("PyObject_CallMethod(global_pickler, \"dumps\", \"O\", src_out->value);"));
        assert!(body.contains(
            "send_timed_message(MSEC(5), MSG_TYPE_TAGGED_MESSAGE, 0, 1, \"federate 1 via the RTI\", message_length, (unsigned char*)serialized_pyobject_buffer.buf);"
        ));
    }

    #[test]
    fn physical_and_decentralized_message_types() {
        let mut p = federated(None);
        let mut config = TargetConfig::new(Target::Python);
        config.coordination = CoordinationType::Decentralized;
        let tools = FixedTools::none();
        let ctx = GenContext::new(&config, &tools);
        let body = generate_sender_body(&ctx, &p, &p.network_connections[0]).unwrap();
        assert!(body.contains("MSG_TYPE_P2P_TAGGED_MESSAGE, 0, 1, \"federate 1\""));
        p.network_connections[0].is_physical = true;
        let body = generate_sender_body(&ctx, &p, &p.network_connections[0]).unwrap();
        assert!(body.contains("send_message(MSG_TYPE_P2P_MESSAGE, 0, 1, \"federate 1\""));
    }

    #[test]
    fn receiver_unpickles_and_sets() {
        let p = federated(Some(SerializerTag::Native));
        let config = TargetConfig::new(Target::Python);
        let tools = FixedTools::none();
        let ctx = GenContext::new(&config, &tools);
        let body = generate_receiver_body(&ctx, &p, &p.network_connections[0]).unwrap();
        assert!(body.contains("PyBytes_FromStringAndSize((char*)networkMessage_0->token->value, networkMessage_0->token->length);"));
        assert!(body.contains("\"loads\""));
        assert!(body.contains("SET(dst_inp, deserialized_message);"));
        assert!(body.ends_with("PyGILState_Release(gstate);"));
    }

    #[test]
    fn ros2_is_never_available() {
        let p = federated(Some(SerializerTag::Ros2));
        let config = TargetConfig::new(Target::Python);
        let tools = FixedTools::none();
        let mut ctx = GenContext::new(&config, &tools);
        let err = enable_serializers(&mut ctx, &p, &p.federates[0]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MISSING_SERIALIZER);
        assert_eq!(err.subject(), "src.src.out -> dst.dst.inp");
    }

    #[test]
    fn proto_needs_configured_files() {
        let p = federated(Some(SerializerTag::Proto));
        let config = TargetConfig::new(Target::Python);
        let tools = FixedTools::none();
        let ctx = GenContext::new(&config, &tools);
        assert!(resolve_serializer(&ctx, &p, &p.network_connections[0]).is_err());
    }

    #[test]
    fn proto_without_protoc_degrades() {
        let p = federated(Some(SerializerTag::Proto));
        let mut config = TargetConfig::new(Target::Python);
        config.proto_files = vec!["person.proto".into()];
        let tools = FixedTools::none();
        let mut ctx = GenContext::new(&config, &tools);
        let support = enable_serializers(&mut ctx, &p, &p.federates[0]).unwrap();
        assert_eq!(support.enabled, vec![SerializerTag::Proto]);
        assert_eq!(support.python_preamble, vec!["import person_pb2 as person"]);
        assert!(support.pre_build.is_empty());
        assert!(support.install_requires.is_empty());
        assert_eq!(ctx.diagnostics.warnings[0].code, ErrorCode::MISSING_TOOL);
    }

    #[test]
    fn native_and_proto_are_enabled_independently() {
        let p = federated(None);
        let mut config = TargetConfig::new(Target::Python);
        config.proto_files = vec!["person.proto".into()];
        let tools = FixedTools::none().with(PROTOC, "/usr/bin/protoc");
        let mut ctx = GenContext::new(&config, &tools).with_source_dir("/src");
        let support = enable_serializers(&mut ctx, &p, &p.federates[1]).unwrap();
        assert_eq!(support.enabled, vec![SerializerTag::Native, SerializerTag::Proto]);
        assert!(support.c_preamble.contains(&"#define PYTHON_NATIVE_SERIALIZATION".to_string()));
        assert_eq!(
            support.pre_build,
            vec![vec!["/usr/bin/protoc", "--python_out=.", "/src/person.proto"]]
        );
        assert_eq!(support.install_requires, vec![PROTO_PYTHON_REQUIREMENT]);
        assert!(ctx.diagnostics.warnings.is_empty());
    }
}
