use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;

use domain::{is_wire_timestamp, DueDate, Todo, TodoDraft, TodoPatch, WIRE_FORMAT};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthBody { status: "ok" }))
}

pub async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = state.db.list_todos()?;
    Ok(Json(todos))
}

pub async fn show_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, ApiError> {
    let todo = state.db.get_todo(id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(todo))
}

/// POST /todos. Fills the missing attributes here so rows created directly
/// against the API carry the same defaults as client-created ones:
/// due date a day out (server clock, UTC) and order one past the highest.
pub async fn create_todo(
    State(state): State<AppState>,
    Json(mut draft): Json<TodoDraft>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    if draft.content.is_none() {
        return Err(ApiError::Validation("content is required".to_string()));
    }
    check_due_date(draft.due_date.as_ref())?;

    let order = match draft.order {
        Some(order) => order,
        None => state.db.next_order()?,
    };
    if draft.due_date.is_none() {
        draft.due_date = Some(server_due_default());
    }

    let todo = draft.with_defaults(order);
    let created = state.db.insert_todo(&todo)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT/PATCH /todos/:id. Partial attributes merged onto the stored row.
pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<TodoPatch>,
) -> Result<Json<Todo>, ApiError> {
    if let Some(content) = &patch.content {
        if content.trim().is_empty() {
            return Err(ApiError::Validation("content cannot be blank".to_string()));
        }
    }
    check_due_date(patch.due_date.as_ref())?;

    let mut todo = state.db.get_todo(id)?.ok_or(ApiError::NotFound)?;
    patch.apply_to(&mut todo);
    state.db.update_todo(id, &todo)?;

    Ok(Json(todo))
}

/// DELETE /todos/:id, responding with the destroyed row.
pub async fn destroy_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, ApiError> {
    let deleted = state.db.delete_todo(id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(deleted))
}

fn server_due_default() -> DueDate {
    let due = Utc::now() + Duration::hours(24);
    DueDate::Wire(due.format(WIRE_FORMAT).to_string())
}

fn check_due_date(due_date: Option<&DueDate>) -> Result<(), ApiError> {
    if let Some(DueDate::Wire(raw)) = due_date {
        if !is_wire_timestamp(raw) {
            return Err(ApiError::Validation(format!(
                "due_date must be formatted YYYY-MM-DDTHH:MM:SSZ, got {raw}"
            )));
        }
    }
    Ok(())
}
