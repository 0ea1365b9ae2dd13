use chrono::{Duration, Utc};
use thiserror::Error;

use domain::{Todo, TodoDraft, TodoPatch, WIRE_FORMAT};

/// Failure talking to the backing store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("could not decode server response: {0}")]
    Decode(String),

    #[error("todo has never been saved")]
    NeverSaved,
}

impl From<reqwest::Error> for PersistenceError {
    fn from(e: reqwest::Error) -> Self {
        PersistenceError::Transport(e.to_string())
    }
}

/// Server-side persistence seam for the collection store. Implementations
/// apply the same defaulting rules the HTTP API does, so the client behaves
/// identically against either.
pub trait BackingStore {
    fn fetch_all(&mut self) -> Result<Vec<Todo>, PersistenceError>;
    fn create(&mut self, draft: &TodoDraft) -> Result<Todo, PersistenceError>;
    fn update(&mut self, id: i64, patch: &TodoPatch) -> Result<Todo, PersistenceError>;
    fn destroy(&mut self, id: i64) -> Result<Todo, PersistenceError>;
}

/// Talks to the todos API over blocking HTTP.
pub struct HttpStore {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn check(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, PersistenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        // The API reports failures as {"error": message}.
        let message = response
            .json::<serde_json::Value>()
            .ok()
            .and_then(|body| body["error"].as_str().map(str::to_string))
            .unwrap_or_else(|| status.to_string());
        Err(PersistenceError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::blocking::Response,
    ) -> Result<T, PersistenceError> {
        response
            .json()
            .map_err(|e| PersistenceError::Decode(e.to_string()))
    }
}

impl BackingStore for HttpStore {
    fn fetch_all(&mut self) -> Result<Vec<Todo>, PersistenceError> {
        let response = self.client.get(format!("{}/todos", self.base_url)).send()?;
        Self::decode(Self::check(response)?)
    }

    fn create(&mut self, draft: &TodoDraft) -> Result<Todo, PersistenceError> {
        let response = self
            .client
            .post(format!("{}/todos", self.base_url))
            .json(draft)
            .send()?;
        Self::decode(Self::check(response)?)
    }

    fn update(&mut self, id: i64, patch: &TodoPatch) -> Result<Todo, PersistenceError> {
        let response = self
            .client
            .put(format!("{}/todos/{id}", self.base_url))
            .json(patch)
            .send()?;
        Self::decode(Self::check(response)?)
    }

    fn destroy(&mut self, id: i64) -> Result<Todo, PersistenceError> {
        let response = self
            .client
            .delete(format!("{}/todos/{id}", self.base_url))
            .send()?;
        Self::decode(Self::check(response)?)
    }
}

/// In-process stand-in for the HTTP API. Used by tests and by the TUI when
/// no server is configured.
pub struct MemoryStore {
    rows: Vec<Todo>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }

    /// Pre-seeded store. Rows without ids get them assigned.
    pub fn with_rows(rows: Vec<Todo>) -> Self {
        let mut store = Self::new();
        for row in rows {
            let mut row = row;
            if row.id.is_none() {
                row.id = Some(store.next_id);
            }
            store.next_id = store.next_id.max(row.id.unwrap_or(0) + 1);
            store.rows.push(row);
        }
        store
    }

    pub fn rows(&self) -> &[Todo] {
        &self.rows
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingStore for MemoryStore {
    fn fetch_all(&mut self) -> Result<Vec<Todo>, PersistenceError> {
        Ok(self.rows.clone())
    }

    fn create(&mut self, draft: &TodoDraft) -> Result<Todo, PersistenceError> {
        if draft.content.is_none() {
            return Err(PersistenceError::Rejected {
                status: 400,
                message: "content is required".to_string(),
            });
        }

        let order = match draft.order {
            Some(order) => order,
            None => self.rows.iter().map(|t| t.order).max().unwrap_or(0) + 1,
        };
        let mut draft = draft.clone();
        if draft.due_date.is_none() {
            draft.due_date = Some(server_due_default());
        }

        let mut todo = draft.with_defaults(order);
        todo.id = Some(self.next_id);
        self.next_id += 1;
        self.rows.push(todo.clone());
        Ok(todo)
    }

    fn update(&mut self, id: i64, patch: &TodoPatch) -> Result<Todo, PersistenceError> {
        let row = self
            .rows
            .iter_mut()
            .find(|t| t.id == Some(id))
            .ok_or(PersistenceError::Rejected {
                status: 404,
                message: "Not found".to_string(),
            })?;
        patch.apply_to(row);
        Ok(row.clone())
    }

    fn destroy(&mut self, id: i64) -> Result<Todo, PersistenceError> {
        let position = self.rows.iter().position(|t| t.id == Some(id)).ok_or(
            PersistenceError::Rejected {
                status: 404,
                message: "Not found".to_string(),
            },
        )?;
        Ok(self.rows.remove(position))
    }
}

/// Missing due dates get a day out on the server clock, same as the API.
fn server_due_default() -> domain::DueDate {
    let due = Utc::now() + Duration::hours(24);
    domain::DueDate::Wire(due.format(WIRE_FORMAT).to_string())
}
