use domain::TodoDraft;

use crate::presenter::ItemPresenter;
use crate::store::{Cid, StoreEvent, TodoStore};

/// Derived counts for the header and footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub remaining: usize,
    pub done: usize,
    /// `None` while the collection is empty; the footer is hidden then.
    pub footer: Option<String>,
    /// The toggle-all indicator reads checked when nothing remains.
    pub toggle_all_checked: bool,
}

/// Owns the store and the presenter list, and turns user intents into
/// store calls. All state the screen shows lives here or below; the ui
/// layer only maps gestures in and view models out.
pub struct AppShell {
    store: TodoStore,
    presenters: Vec<ItemPresenter>,
    input: String,
    status: Option<String>,
}

impl AppShell {
    pub fn new(store: TodoStore) -> Self {
        Self {
            store,
            presenters: Vec::new(),
            input: String::new(),
            status: None,
        }
    }

    /// Fetches the collection and builds the initial presenter list.
    pub fn start(&mut self) {
        if let Err(e) = self.store.fetch_all() {
            self.status = Some(e.to_string());
        }
        self.pump();
    }

    /// Dispatches queued store notifications, in order, to the presenter
    /// list: `Reset` rebuilds it, `Added` appends, `Removed` tears down,
    /// `Changed` re-renders the one fragment.
    pub fn pump(&mut self) {
        for event in self.store.take_events() {
            match event {
                StoreEvent::Reset => {
                    self.presenters.clear();
                    for entry in self.store.entries() {
                        let (presenter, error) = ItemPresenter::new(entry);
                        self.presenters.push(presenter);
                        if let Some(e) = error {
                            self.status = Some(e.to_string());
                        }
                    }
                }
                StoreEvent::Added(cid) => {
                    if let Some(entry) = self.store.get(cid) {
                        let (presenter, error) = ItemPresenter::new(entry);
                        self.presenters.push(presenter);
                        if let Some(e) = error {
                            self.status = Some(e.to_string());
                        }
                    }
                }
                StoreEvent::Changed(cid) => {
                    if let Some(entry) = self.store.get(cid) {
                        if let Some(presenter) =
                            self.presenters.iter_mut().find(|p| p.cid() == cid)
                        {
                            if let Err(e) = presenter.refresh(entry) {
                                self.status = Some(e.to_string());
                            }
                        }
                    }
                }
                StoreEvent::Removed(cid) => {
                    self.presenters.retain(|p| p.cid() != cid);
                }
            }
        }
    }

    pub fn summary(&self) -> Summary {
        let remaining = self.store.remaining().len();
        let done = self.store.done().len();
        let footer = if self.store.is_empty() {
            None
        } else {
            Some(format!("{remaining} items left · {done} completed"))
        };
        Summary {
            remaining,
            done,
            footer,
            toggle_all_checked: remaining == 0,
        }
    }

    pub fn presenters(&self) -> &[ItemPresenter] {
        &self.presenters
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Typing goes to the open editor if there is one, otherwise to the
    /// new-todo input.
    pub fn on_char(&mut self, c: char) {
        if let Some(presenter) = self.presenters.iter_mut().find(|p| p.is_editing()) {
            presenter.push_char(c);
        } else {
            self.input.push(c);
        }
    }

    pub fn on_backspace(&mut self) {
        if let Some(presenter) = self.presenters.iter_mut().find(|p| p.is_editing()) {
            presenter.backspace();
        } else {
            self.input.pop();
        }
    }

    /// Enter commits an open editor, otherwise submits the new-todo input.
    pub fn on_enter(&mut self) {
        self.status = None;
        if self.any_editor_open() {
            self.commit_open_editors();
        } else {
            self.create_on_enter();
        }
        self.pump();
    }

    /// Esc is focus loss, and focus loss commits.
    pub fn on_escape(&mut self) {
        self.status = None;
        self.commit_open_editors();
        self.pump();
    }

    /// Tab hops between the content and date editors of the row being
    /// edited, committing the one it leaves.
    pub fn on_tab(&mut self) {
        let open = self
            .presenters
            .iter()
            .find(|p| p.is_editing())
            .map(|p| (p.cid(), p.is_editing_content()));
        let Some((cid, was_content)) = open else {
            return;
        };

        self.status = None;
        self.commit_open_editors();
        self.pump();
        if let Some(presenter) = self.presenters.iter_mut().find(|p| p.cid() == cid) {
            if was_content {
                presenter.begin_date_edit();
            } else {
                presenter.begin_content_edit();
            }
        }
    }

    /// Single click on a row's checkbox zone.
    pub fn on_toggle_click(&mut self, cid: Cid) {
        self.status = None;
        self.commit_open_editors();
        if let Err(e) = self.store.toggle_done(cid) {
            self.status = Some(e.to_string());
        }
        self.pump();
    }

    /// Click on a row's destroy zone.
    pub fn on_destroy_click(&mut self, cid: Cid) {
        self.status = None;
        self.commit_open_editors();
        if let Err(e) = self.store.destroy(cid) {
            self.status = Some(e.to_string());
        }
        self.pump();
    }

    /// Double click on a row's content cell.
    pub fn on_edit_content(&mut self, cid: Cid) {
        self.status = None;
        self.commit_open_editors();
        self.pump();
        if let Some(presenter) = self.presenters.iter_mut().find(|p| p.cid() == cid) {
            presenter.begin_content_edit();
        }
    }

    /// Double click on a row's date cell.
    pub fn on_edit_date(&mut self, cid: Cid) {
        self.status = None;
        self.commit_open_editors();
        self.pump();
        if let Some(presenter) = self.presenters.iter_mut().find(|p| p.cid() == cid) {
            presenter.begin_date_edit();
        }
    }

    /// Click anywhere else: blur, which commits.
    pub fn on_blur(&mut self) {
        self.commit_open_editors();
        self.pump();
    }

    /// The toggle-all control drives every entity to the opposite of the
    /// indicator: done while anything remains, undone otherwise.
    pub fn on_toggle_all(&mut self) {
        self.status = None;
        self.commit_open_editors();
        let done = !self.store.remaining().is_empty();
        let failures = self.store.toggle_all(done);
        if !failures.is_empty() {
            self.status = Some(format!("{} update(s) failed", failures.len()));
        }
        self.pump();
    }

    pub fn on_clear_completed(&mut self) {
        self.status = None;
        self.commit_open_editors();
        let failures = self.store.clear_completed();
        if !failures.is_empty() {
            self.status = Some(format!("{} delete(s) failed", failures.len()));
        }
        self.pump();
    }

    fn any_editor_open(&self) -> bool {
        self.presenters.iter().any(|p| p.is_editing())
    }

    fn commit_open_editors(&mut self) {
        let Self {
            store,
            presenters,
            status,
            ..
        } = self;
        for presenter in presenters.iter_mut() {
            if presenter.is_editing_content() {
                if let Err(e) = presenter.commit_content(store) {
                    *status = Some(e.to_string());
                }
            }
            if presenter.is_editing_date() {
                if let Err(e) = presenter.commit_date(store) {
                    *status = Some(e.to_string());
                }
            }
        }
    }

    fn create_on_enter(&mut self) {
        if self.input.is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.input);
        if let Err(e) = self.store.create(TodoDraft::with_content(content)) {
            self.status = Some(e.to_string());
        }
    }
}
