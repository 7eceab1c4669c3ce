use forja_lib::error::{ErrorKind, ForjaError};
use forja_lib::store::StoreError;

#[test]
fn test_error_creation() {
    let error = ForjaError::new(ErrorKind::Storage, "Test error", "test_stage");
    assert_eq!(error.message, "Test error");
    assert_eq!(error.stage, "test_stage");
    assert_eq!(error.kind, ErrorKind::Storage);
}

#[test]
fn test_error_with_context() {
    let error = ForjaError::insufficient_data("Test error", "test_stage")
        .with_context("Additional context");
    assert!(error.context.is_some());
    assert_eq!(error.context.unwrap(), "Additional context");
}

#[test]
fn test_error_display() {
    let error = ForjaError::not_found("Test error", "test_stage")
        .with_context("context")
        .with_source("source");
    let display = format!("{}", error);
    assert!(display.contains("[test_stage]"));
    assert!(display.contains("Test error"));
    assert!(display.contains("(context: context)"));
    assert!(display.contains("(source: source)"));
}

#[test]
fn test_store_error_kinds() {
    let err: ForjaError = StoreError::NotFound {
        entity: "task",
        id: "7".into(),
    }
    .into();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.stage, "store");

    let err: ForjaError = StoreError::Invalid("bad".into()).into();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let err: ForjaError = StoreError::Unavailable("locked".into()).into();
    assert_eq!(err.kind, ErrorKind::Storage);
}

#[test]
fn test_error_serializes_kind_snake_case() {
    let error = ForjaError::insufficient_data("x", "weekly_report");
    let json = serde_json::to_value(&error).unwrap();
    assert_eq!(json["kind"], "insufficient_data");
}
