//! Precondition checks performed before any network interaction.
//!
//! Failures here are [`Error::Validation`]: surfaced immediately, never
//! retried, never counted against the circuit breaker.

use crate::types::{CreateWorkItemPayload, PatchOperation};
use crate::{Error, ErrorContext, Result};

const TITLE_FIELD: &str = "System.Title";
const MAX_TITLE_LEN: usize = 255;

/// Fields that must carry numeric values when present.
const NUMBER_FIELDS: [&str; 4] = [
    "Microsoft.VSTS.Scheduling.StoryPoints",
    "Microsoft.VSTS.Scheduling.Effort",
    "Microsoft.VSTS.Scheduling.RemainingWork",
    "Microsoft.VSTS.Common.Priority",
];

const PRIORITY_FIELD: &str = "Microsoft.VSTS.Common.Priority";

fn invalid(msg: impl Into<String>, field: &str) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new()
            .with_source("validation")
            .with_target(field),
    )
}

/// Shape-check a create payload: type, non-empty fields, a usable title and
/// numeric scheduling fields.
pub fn validate_create_payload(payload: &CreateWorkItemPayload) -> Result<()> {
    if payload.work_item_type.trim().is_empty() {
        return Err(invalid("work item type is required", "type"));
    }
    if payload.fields.is_empty() {
        return Err(invalid("work item fields are required", "fields"));
    }

    let title = payload
        .fields
        .get(TITLE_FIELD)
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid("System.Title is required and must be a string", TITLE_FIELD))?;
    if title.is_empty() {
        return Err(invalid("System.Title cannot be empty", TITLE_FIELD));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(invalid(
            format!("System.Title cannot exceed {} characters", MAX_TITLE_LEN),
            TITLE_FIELD,
        ));
    }

    for field in NUMBER_FIELDS {
        if let Some(value) = payload.fields.get(field) {
            if !value.is_number() {
                return Err(invalid(format!("{} must be a number", field), field));
            }
        }
    }

    if let Some(priority) = payload.fields.get(PRIORITY_FIELD).and_then(|v| v.as_f64()) {
        if !(1.0..=4.0).contains(&priority) {
            return Err(invalid("Priority must be between 1 and 4", PRIORITY_FIELD));
        }
    }

    Ok(())
}

/// An update must carry at least one patch operation.
pub fn validate_update_operations(operations: &[PatchOperation]) -> Result<()> {
    if operations.is_empty() {
        return Err(invalid("update operations are required", "operations"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn payload(fields: Vec<(&str, serde_json::Value)>) -> CreateWorkItemPayload {
        let mut map = Map::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v);
        }
        CreateWorkItemPayload::new("Bug", map)
    }

    #[test]
    fn accepts_a_minimal_payload() {
        let p = payload(vec![("System.Title", json!("Crash on save"))]);
        assert!(validate_create_payload(&p).is_ok());
    }

    #[test]
    fn rejects_missing_or_empty_title() {
        let p = payload(vec![("System.Description", json!("no title"))]);
        assert!(validate_create_payload(&p).is_err());

        let p = payload(vec![("System.Title", json!(""))]);
        assert!(validate_create_payload(&p).is_err());
    }

    #[test]
    fn rejects_oversized_title() {
        let p = payload(vec![("System.Title", json!("x".repeat(256)))]);
        assert!(validate_create_payload(&p).is_err());
        let p = payload(vec![("System.Title", json!("x".repeat(255)))]);
        assert!(validate_create_payload(&p).is_ok());
    }

    #[test]
    fn rejects_empty_type_and_fields() {
        let p = CreateWorkItemPayload::new("", Map::new());
        assert!(validate_create_payload(&p).is_err());
        let p = CreateWorkItemPayload::new("Bug", Map::new());
        assert!(validate_create_payload(&p).is_err());
    }

    #[test]
    fn rejects_non_numeric_scheduling_fields() {
        let p = payload(vec![
            ("System.Title", json!("t")),
            ("Microsoft.VSTS.Scheduling.StoryPoints", json!("five")),
        ]);
        assert!(validate_create_payload(&p).is_err());
    }

    #[test]
    fn priority_must_be_in_range() {
        for bad in [0, 5] {
            let p = payload(vec![
                ("System.Title", json!("t")),
                ("Microsoft.VSTS.Common.Priority", json!(bad)),
            ]);
            assert!(validate_create_payload(&p).is_err());
        }
        let p = payload(vec![
            ("System.Title", json!("t")),
            ("Microsoft.VSTS.Common.Priority", json!(2)),
        ]);
        assert!(validate_create_payload(&p).is_ok());
    }

    #[test]
    fn update_requires_operations() {
        assert!(validate_update_operations(&[]).is_err());
        let ops = [PatchOperation::add("/fields/System.Title", json!("t"))];
        assert!(validate_update_operations(&ops).is_ok());
    }
}
