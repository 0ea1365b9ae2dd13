use thiserror::Error;

use domain::{DateFormatError, DueDate, TodoPatch};

use crate::backend::PersistenceError;
use crate::store::{Cid, StoredTodo, TodoStore};

/// Failure while committing an edit.
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Date(#[from] DateFormatError),

    #[error(transparent)]
    Persist(#[from] PersistenceError),
}

/// One field's edit state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Viewing,
    Editing { buffer: String },
}

/// What one list row renders from. Rebuilt on every change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub id: Option<i64>,
    pub content: String,
    pub order: i64,
    pub done: bool,
    /// Display form, e.g. "June 5".
    pub formatted_date: String,
    /// Edit form, e.g. "6/5/2023".
    pub datepicker_date: String,
}

/// Presents a single entity: keeps its render fragment current and owns the
/// two independent edit toggles, one for the content and one for the date.
pub struct ItemPresenter {
    cid: Cid,
    view: ItemView,
    content_edit: EditState,
    date_edit: EditState,
}

impl ItemPresenter {
    /// Builds the presenter and renders the first fragment. A date error
    /// leaves the date cells blank and is handed back for the status line.
    pub fn new(entry: &StoredTodo) -> (Self, Option<DateFormatError>) {
        let mut presenter = Self {
            cid: entry.cid,
            view: ItemView {
                id: entry.todo.id,
                content: entry.todo.content.clone(),
                order: entry.todo.order,
                done: entry.todo.done,
                formatted_date: String::new(),
                datepicker_date: String::new(),
            },
            content_edit: EditState::Viewing,
            date_edit: EditState::Viewing,
        };
        let error = presenter.refresh(entry).err();
        (presenter, error)
    }

    /// Rebuilds the fragment from the entity. On a date error the previous
    /// fragment stays on screen and the error is reported; other entities
    /// are unaffected either way.
    pub fn refresh(&mut self, entry: &StoredTodo) -> Result<(), DateFormatError> {
        let formatted_date = entry.todo.due_date.format_display()?;
        let datepicker_date = entry.todo.due_date.format_for_datepicker()?;
        self.view = ItemView {
            id: entry.todo.id,
            content: entry.todo.content.clone(),
            order: entry.todo.order,
            done: entry.todo.done,
            formatted_date,
            datepicker_date,
        };
        Ok(())
    }

    pub fn cid(&self) -> Cid {
        self.cid
    }

    pub fn view(&self) -> &ItemView {
        &self.view
    }

    pub fn is_editing_content(&self) -> bool {
        matches!(self.content_edit, EditState::Editing { .. })
    }

    pub fn is_editing_date(&self) -> bool {
        matches!(self.date_edit, EditState::Editing { .. })
    }

    pub fn is_editing(&self) -> bool {
        self.is_editing_content() || self.is_editing_date()
    }

    pub fn content_buffer(&self) -> Option<&str> {
        match &self.content_edit {
            EditState::Editing { buffer } => Some(buffer),
            EditState::Viewing => None,
        }
    }

    pub fn date_buffer(&self) -> Option<&str> {
        match &self.date_edit {
            EditState::Editing { buffer } => Some(buffer),
            EditState::Viewing => None,
        }
    }

    /// Opens the content editor prefilled with the current content.
    pub fn begin_content_edit(&mut self) {
        self.content_edit = EditState::Editing {
            buffer: self.view.content.clone(),
        };
    }

    /// Opens the date editor prefilled in datepicker format.
    pub fn begin_date_edit(&mut self) {
        self.date_edit = EditState::Editing {
            buffer: self.view.datepicker_date.clone(),
        };
    }

    /// Types into whichever editor is open.
    pub fn push_char(&mut self, c: char) {
        match (&mut self.content_edit, &mut self.date_edit) {
            (EditState::Editing { buffer }, _) => buffer.push(c),
            (_, EditState::Editing { buffer }) => buffer.push(c),
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        match (&mut self.content_edit, &mut self.date_edit) {
            (EditState::Editing { buffer }, _) => {
                buffer.pop();
            }
            (_, EditState::Editing { buffer }) => {
                buffer.pop();
            }
            _ => {}
        }
    }

    /// Commits the content editor (Enter or focus loss). An empty buffer
    /// destroys the entity; the removal notification that follows tears
    /// this presenter down.
    pub fn commit_content(&mut self, store: &mut TodoStore) -> Result<(), EditError> {
        let EditState::Editing { buffer } = std::mem::take(&mut self.content_edit) else {
            return Ok(());
        };
        if buffer.is_empty() {
            store.destroy(self.cid)?;
            return Ok(());
        }
        store.save(self.cid, TodoPatch::content(buffer))?;
        Ok(())
    }

    /// Commits the date editor. The buffer must parse as M/D/YYYY; a parse
    /// failure aborts this one operation and the entity keeps its date.
    pub fn commit_date(&mut self, store: &mut TodoStore) -> Result<(), EditError> {
        let EditState::Editing { buffer } = std::mem::take(&mut self.date_edit) else {
            return Ok(());
        };
        let due = DueDate::from_datepicker_input(&buffer)?;
        store.save(self.cid, TodoPatch::due_date(due))?;
        Ok(())
    }
}
