// crates/blockcore/tests/core_test.rs

use blockcore::{
    BlockEvent, BlockOutput, BlockSchema, Cardinality, CatalogEntry, EventBus, EventEmitter,
    ExecutionEvent, ExecutionId, ExternalExecutionRequest, ExternalExecutionResponse, FieldRole,
    Value, ValueType, WorkflowDescription,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[test]
fn test_coerce_integer_from_string_and_number() {
    let root = Path::new(".");

    assert_eq!(ValueType::Integer.coerce(&json!("42"), root), Ok(Value::Integer(42)));
    assert_eq!(ValueType::Integer.coerce(&json!(" 7 "), root), Ok(Value::Integer(7)));
    assert_eq!(ValueType::Integer.coerce(&json!(-3), root), Ok(Value::Integer(-3)));

    let err = ValueType::Integer.coerce(&json!("abc"), root).unwrap_err();
    assert!(err.contains("abc"), "error should describe the raw value: {}", err);

    assert!(ValueType::Integer.coerce(&json!(1.5), root).is_err());
    assert!(ValueType::Integer.coerce(&json!(true), root).is_err());
}

#[test]
fn test_coerce_number_bool_and_string() {
    let root = Path::new(".");

    assert_eq!(ValueType::Number.coerce(&json!("2.5"), root), Ok(Value::Number(2.5)));
    assert_eq!(ValueType::Number.coerce(&json!(3), root), Ok(Value::Number(3.0)));

    assert_eq!(ValueType::Bool.coerce(&json!("true"), root), Ok(Value::Bool(true)));
    assert_eq!(ValueType::Bool.coerce(&json!(false), root), Ok(Value::Bool(false)));
    assert!(ValueType::Bool.coerce(&json!("yes"), root).is_err());

    assert_eq!(
        ValueType::String.coerce(&json!(12), root),
        Ok(Value::String("12".to_string()))
    );
    assert!(ValueType::String.coerce(&json!(null), root).is_err());
}

#[test]
fn test_coerce_file_resolves_against_data_root() {
    let root = Path::new("/srv/data");

    let value = ValueType::File.coerce(&json!("input/a.csv"), root).unwrap();
    assert_eq!(value, Value::File(PathBuf::from("/srv/data/input/a.csv")));

    assert!(ValueType::File.coerce(&json!(""), root).is_err());
    assert!(ValueType::File.coerce(&json!(5), root).is_err());
}

#[test]
fn test_coerce_json_and_any() {
    let root = Path::new(".");

    let parsed = ValueType::Json.coerce(&json!("{\"a\": [1, 2]}"), root).unwrap();
    assert_eq!(parsed, Value::Json(json!({"a": [1, 2]})));

    // Text that is not JSON is kept as a JSON string
    let raw = ValueType::Json.coerce(&json!("not json"), root).unwrap();
    assert_eq!(raw, Value::Json(json!("not json")));

    let any = ValueType::Any.coerce(&json!([1, "x", null]), root).unwrap();
    assert_eq!(
        any,
        Value::Array(vec![
            Value::Integer(1),
            Value::String("x".to_string()),
            Value::Null
        ])
    );
}

#[test]
fn test_value_accessors_widen_numbers() {
    assert_eq!(Value::Integer(4).as_f64(), Some(4.0));
    assert_eq!(Value::Number(4.0).as_i64(), Some(4));
    assert_eq!(Value::Number(4.5).as_i64(), None);
    assert_eq!(Value::from("s").as_i64(), None);
    assert_eq!(Value::Bool(true).type_name(), "bool");
}

#[test]
fn test_as_i64_rejects_numbers_outside_i64() {
    assert_eq!(Value::Number(1e19).as_i64(), None);
    assert_eq!(Value::Number(-1e19).as_i64(), None);
    assert_eq!(Value::Number(9_223_372_036_854_775_807.0).as_i64(), None);
    assert_eq!(Value::Number(f64::INFINITY).as_i64(), None);
    assert_eq!(Value::Number(f64::NAN).as_i64(), None);

    assert_eq!(Value::Number(-9_223_372_036_854_775_808.0).as_i64(), Some(i64::MIN));
    assert_eq!(Value::Number(1e15).as_i64(), Some(1_000_000_000_000_000));
}

#[test]
fn test_coerce_rejects_numbers_without_a_json_form() {
    let root = Path::new(".");

    assert!(ValueType::Number.coerce(&json!("NaN"), root).is_err());
    assert!(ValueType::Number.coerce(&json!("inf"), root).is_err());
    assert!(ValueType::Number.coerce(&json!("-infinity"), root).is_err());
    assert!(ValueType::Number.coerce(&json!("1e999"), root).is_err());

    // Accepted values survive the tagged encoding used for worker files
    for raw in [json!(u64::MAX), json!([1.5, {"n": u64::MAX}])] {
        let value = ValueType::Any.coerce(&raw, root).unwrap();
        let encoded = serde_json::to_string(&value).unwrap();
        assert!(!encoded.contains("null"), "lossy encoding: {}", encoded);
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, value);
    }
}

#[test]
fn test_catalog_entry_lists_properties_inputs_outputs() {
    let schema = BlockSchema::new("math.scale")
        .family("Arithmetic")
        .module("standard")
        .description("Scale a list")
        .property("factor", ValueType::Number, Some("1.0"))
        .property("label", ValueType::String, None)
        .input("values", ValueType::Number, Cardinality::List)
        .output("scaled", ValueType::Number);

    let entry = CatalogEntry::from(&schema);
    assert_eq!(entry.name, "math.scale");
    assert_eq!(entry.family, "Arithmetic");
    assert_eq!(entry.module, "standard");

    let roles: Vec<FieldRole> = entry.fields.iter().map(|f| f.role).collect();
    assert_eq!(
        roles,
        vec![
            FieldRole::Property,
            FieldRole::Property,
            FieldRole::Input,
            FieldRole::Output
        ]
    );

    let json = serde_json::to_value(&entry).unwrap();
    let factor = &json["fields"][0];
    assert_eq!(factor["name"], "factor");
    assert_eq!(factor["type"], "number");
    assert_eq!(factor["defaultValue"], "1.0");
    assert_eq!(factor["attrs"], "editable");

    // Properties without a default still carry an empty one for the designer
    assert_eq!(json["fields"][1]["defaultValue"], "");

    let values = &json["fields"][2];
    assert_eq!(values["cardinality"], "list");
    assert!(values.get("attrs").is_none());
}

#[test]
fn test_workflow_description_from_designer_json() {
    let text = r#"{
        "name": "designer export",
        "blocks": [
            {"id": 1, "type": "math.constant", "values": {"value": "5"}},
            {"id": 2, "type": "math.increment", "module": "standard"}
        ],
        "edges": [
            {"sourceBlockId": 1, "sourceOutputPort": "value", "destBlockId": 2, "destInputPort": "value"}
        ]
    }"#;

    let workflow: WorkflowDescription = serde_json::from_str(text).unwrap();
    assert_eq!(workflow.blocks.len(), 2);
    assert_eq!(workflow.edges[0].dest_input_port, "value");

    let constant = workflow.find_block(1).unwrap();
    assert_eq!(constant.block_type, "math.constant");
    assert_eq!(constant.values["value"], json!("5"));
    assert_eq!(workflow.find_block(2).unwrap().module, "standard");
}

#[test]
fn test_worker_response_missing_fields_default() {
    let response: ExternalExecutionResponse =
        serde_json::from_str(r#"{"blockType": "math.multiply"}"#).unwrap();

    assert_eq!(response.block_type, "math.multiply");
    assert!(response.outputs.is_empty());
    assert_eq!(response.computed_result, Value::Null);
}

#[test]
fn test_worker_response_echoes_request() {
    let mut inputs = HashMap::new();
    inputs.insert("value".to_string(), Value::Integer(7));
    let request = ExternalExecutionRequest {
        block_type: "math.multiply".to_string(),
        module: "standard".to_string(),
        properties: HashMap::new(),
        inputs,
    };

    let output = BlockOutput::new().with_output("value", 14i64).with_result(14i64);
    let response = ExternalExecutionResponse::from_request(request.clone(), output);

    assert_eq!(response.inputs, request.inputs);
    assert_eq!(response.outputs["value"], Value::Integer(14));
    assert_eq!(response.computed_result, Value::Integer(14));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["blockType"], "math.multiply");
    assert!(json.get("computedResult").is_some());
}

#[tokio::test]
async fn test_event_emitter_tags_block_events() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let execution_id = ExecutionId::new_v4();

    let emitter = bus.create_emitter(execution_id, 9);
    emitter.progress(50.0, Some("halfway".to_string()));

    match rx.recv().await.unwrap() {
        ExecutionEvent::BlockEvent {
            execution_id: id,
            block_id,
            event: BlockEvent::Progress { percent, message },
            ..
        } => {
            assert_eq!(id, execution_id);
            assert_eq!(block_id, 9);
            assert_eq!(percent, 50.0);
            assert_eq!(message.as_deref(), Some("halfway"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_event_emitter_info_and_warning() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let emitter = bus.create_emitter(ExecutionId::new_v4(), 3);

    emitter.info("started");
    emitter.warn("slow input");

    let mut messages = Vec::new();
    for _ in 0..2 {
        match rx.recv().await.unwrap() {
            ExecutionEvent::BlockEvent { event: BlockEvent::Info { message }, .. } => {
                messages.push(format!("info: {}", message))
            }
            ExecutionEvent::BlockEvent { event: BlockEvent::Warning { message }, .. } => {
                messages.push(format!("warn: {}", message))
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
    assert_eq!(messages, vec!["info: started", "warn: slow input"]);

    // Nobody listens to a detached emitter; sending must not fail
    EventEmitter::detached(3).info("dropped");
}
