use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use domain::{DueDate, Todo};

use crate::error::ApiError;

/// SQLite-backed todos table. The connection sits behind a mutex so the
/// handlers can share one `TodoDb` across requests.
pub struct TodoDb {
    conn: Mutex<Connection>,
}

impl TodoDb {
    pub fn open(db_path: &Path) -> Result<Self, ApiError> {
        let conn = Connection::open(db_path).map_err(|e| {
            ApiError::Internal(format!("failed to open database {}: {e}", db_path.display()))
        })?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, ApiError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), ApiError> {
        let conn = self.conn.lock().unwrap();
        // "order" is an SQL keyword and stays quoted everywhere.
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                "order" INTEGER NOT NULL,
                done INTEGER NOT NULL DEFAULT 0,
                due_date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn list_todos(&self) -> Result<Vec<Todo>, ApiError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(r#"SELECT id, content, "order", done, due_date FROM todos ORDER BY id"#)?;
        let todos = stmt
            .query_map([], row_to_todo)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    pub fn get_todo(&self, id: i64) -> Result<Option<Todo>, ApiError> {
        let conn = self.conn.lock().unwrap();
        let todo = conn
            .query_row(
                r#"SELECT id, content, "order", done, due_date FROM todos WHERE id = ?1"#,
                [id],
                row_to_todo,
            )
            .optional()?;
        Ok(todo)
    }

    /// Inserts a row and returns the stored todo with its assigned id.
    pub fn insert_todo(&self, todo: &Todo) -> Result<Todo, ApiError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO todos (content, "order", done, due_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                &todo.content,
                todo.order,
                todo.done,
                todo.due_date.as_wire_string(),
                &now,
                &now
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Todo {
            id: Some(id),
            ..todo.clone()
        })
    }

    pub fn update_todo(&self, id: i64, todo: &Todo) -> Result<(), ApiError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            r#"
            UPDATE todos
            SET content = ?1, "order" = ?2, done = ?3, due_date = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
            params![
                &todo.content,
                todo.order,
                todo.done,
                todo.due_date.as_wire_string(),
                &now,
                id
            ],
        )?;
        if rows == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    /// Deletes a row, returning the deleted todo if it existed.
    pub fn delete_todo(&self, id: i64) -> Result<Option<Todo>, ApiError> {
        let conn = self.conn.lock().unwrap();
        let todo = conn
            .query_row(
                r#"SELECT id, content, "order", done, due_date FROM todos WHERE id = ?1"#,
                [id],
                row_to_todo,
            )
            .optional()?;
        if todo.is_some() {
            conn.execute("DELETE FROM todos WHERE id = ?1", [id])?;
        }
        Ok(todo)
    }

    /// Next free position: one past the highest stored "order", 1 for an
    /// empty table.
    pub fn next_order(&self) -> Result<i64, ApiError> {
        let conn = self.conn.lock().unwrap();
        let next = conn.query_row(
            r#"SELECT COALESCE(MAX("order"), 0) + 1 FROM todos"#,
            [],
            |row| row.get(0),
        )?;
        Ok(next)
    }
}

fn row_to_todo(row: &rusqlite::Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: Some(row.get(0)?),
        content: row.get(1)?,
        order: row.get(2)?,
        done: row.get(3)?,
        due_date: DueDate::Wire(row.get(4)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(content: &str, order: i64) -> Todo {
        Todo {
            id: None,
            content: content.to_string(),
            order,
            done: false,
            due_date: DueDate::Wire("2030-06-05T12:00:00Z".to_string()),
        }
    }

    #[test]
    fn insert_assigns_ids_in_sequence() {
        let db = TodoDb::open_in_memory().unwrap();
        let a = db.insert_todo(&sample("first", 1)).unwrap();
        let b = db.insert_todo(&sample("second", 2)).unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
    }

    #[test]
    fn get_returns_stored_fields_verbatim() {
        let db = TodoDb::open_in_memory().unwrap();
        let created = db.insert_todo(&sample("walk the dog", 3)).unwrap();

        let loaded = db.get_todo(created.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.content, "walk the dog");
        assert_eq!(loaded.order, 3);
        assert!(!loaded.done);
        assert_eq!(
            loaded.due_date,
            DueDate::Wire("2030-06-05T12:00:00Z".to_string())
        );
    }

    #[test]
    fn get_missing_row_is_none() {
        let db = TodoDb::open_in_memory().unwrap();
        assert!(db.get_todo(42).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_id() {
        let db = TodoDb::open_in_memory().unwrap();
        db.insert_todo(&sample("a", 5)).unwrap();
        db.insert_todo(&sample("b", 1)).unwrap();

        let all = db.list_todos().unwrap();
        let ids: Vec<_> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[test]
    fn update_overwrites_row() {
        let db = TodoDb::open_in_memory().unwrap();
        let created = db.insert_todo(&sample("before", 1)).unwrap();

        let mut changed = created.clone();
        changed.content = "after".to_string();
        changed.done = true;
        db.update_todo(created.id.unwrap(), &changed).unwrap();

        let loaded = db.get_todo(created.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.content, "after");
        assert!(loaded.done);
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let db = TodoDb::open_in_memory().unwrap();
        let err = db.update_todo(9, &sample("ghost", 1)).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn delete_returns_the_row_once() {
        let db = TodoDb::open_in_memory().unwrap();
        let created = db.insert_todo(&sample("gone soon", 1)).unwrap();
        let id = created.id.unwrap();

        let deleted = db.delete_todo(id).unwrap();
        assert_eq!(deleted.map(|t| t.content), Some("gone soon".to_string()));
        assert!(db.delete_todo(id).unwrap().is_none());
        assert!(db.get_todo(id).unwrap().is_none());
    }

    #[test]
    fn next_order_starts_at_one_then_tracks_max() {
        let db = TodoDb::open_in_memory().unwrap();
        assert_eq!(db.next_order().unwrap(), 1);

        db.insert_todo(&sample("a", 1)).unwrap();
        db.insert_todo(&sample("b", 10)).unwrap();
        assert_eq!(db.next_order().unwrap(), 11);
    }
}
