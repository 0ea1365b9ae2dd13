use crate::due_date::DueDate;
use serde::{Deserialize, Serialize};

/// Content given to todos created with nothing typed in.
pub const EMPTY_CONTENT: &str = "empty todo...";

/// A single todo record. `id` is assigned by the backing store and stays
/// `None` until the first successful persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: Option<i64>,
    pub content: String,
    pub order: i64,
    pub done: bool,
    pub due_date: DueDate,
}

/// Attributes for creating a todo. Missing fields fall back to the entity
/// defaults on whichever side of the wire applies them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
}

/// Partial attributes for updating a todo in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
}

impl TodoDraft {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Merge with the entity defaults: placeholder content, the given
    /// order, done = false, due date = tomorrow. Explicitly supplied
    /// fields always win; empty content counts as missing.
    pub fn with_defaults(self, next_order: i64) -> Todo {
        let content = match self.content {
            Some(value) if !value.is_empty() => value,
            _ => EMPTY_CONTENT.to_string(),
        };
        Todo {
            id: None,
            content,
            order: self.order.unwrap_or(next_order),
            done: self.done.unwrap_or(false),
            due_date: self.due_date.unwrap_or_else(DueDate::tomorrow),
        }
    }
}

impl TodoPatch {
    pub fn content(value: impl Into<String>) -> Self {
        Self {
            content: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn done(value: bool) -> Self {
        Self {
            done: Some(value),
            ..Self::default()
        }
    }

    pub fn due_date(value: DueDate) -> Self {
        Self {
            due_date: Some(value),
            ..Self::default()
        }
    }

    /// Overlay this patch onto an existing todo.
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(content) = &self.content {
            todo.content = content.clone();
        }
        if let Some(order) = self.order {
            todo.order = order;
        }
        if let Some(done) = self.done {
            todo.done = done;
        }
        if let Some(due_date) = &self.due_date {
            todo.due_date = due_date.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    #[test]
    fn defaults_fill_everything_but_keep_explicit_fields() {
        let todo = TodoDraft::with_content("buy milk").with_defaults(4);
        assert_eq!(todo.id, None);
        assert_eq!(todo.content, "buy milk");
        assert_eq!(todo.order, 4);
        assert!(!todo.done);
        assert!(matches!(todo.due_date, DueDate::Local(_)));
    }

    #[test]
    fn empty_content_becomes_the_placeholder() {
        let todo = TodoDraft::with_content("").with_defaults(1);
        assert_eq!(todo.content, EMPTY_CONTENT);

        let todo = TodoDraft::default().with_defaults(1);
        assert_eq!(todo.content, EMPTY_CONTENT);
    }

    #[test]
    fn default_due_date_is_a_day_out() {
        let before = Local::now().naive_local() + Duration::hours(24);
        let todo = TodoDraft::with_content("x").with_defaults(1);
        let after = Local::now().naive_local() + Duration::hours(24);

        let value = todo.due_date.normalize().unwrap();
        assert!(value >= before && value <= after);
    }

    #[test]
    fn explicit_due_date_is_preserved_unchanged() {
        let explicit = DueDate::Wire("2030-01-02T03:04:05Z".to_string());
        let draft = TodoDraft {
            content: Some("x".to_string()),
            due_date: Some(explicit.clone()),
            ..TodoDraft::default()
        };
        assert_eq!(draft.with_defaults(1).due_date, explicit);
    }

    #[test]
    fn patch_overlays_only_present_fields() {
        let mut todo = TodoDraft::with_content("original").with_defaults(2);
        let due = todo.due_date.clone();

        TodoPatch::done(true).apply_to(&mut todo);
        assert!(todo.done);
        assert_eq!(todo.content, "original");
        assert_eq!(todo.due_date, due);

        TodoPatch::content("rewritten").apply_to(&mut todo);
        assert_eq!(todo.content, "rewritten");
        assert!(todo.done);
    }

    #[test]
    fn drafts_serialize_without_absent_fields() {
        let body = serde_json::to_value(TodoDraft::with_content("x")).unwrap();
        assert_eq!(body, serde_json::json!({ "content": "x" }));
    }
}
