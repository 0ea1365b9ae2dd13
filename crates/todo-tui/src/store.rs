use std::collections::VecDeque;

use tracing::warn;

use domain::{Todo, TodoDraft, TodoPatch};

use crate::backend::{BackingStore, PersistenceError};

/// Client-side identity, assigned by the store. Stable for the entity's
/// whole life, present before the server id exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid(u64);

/// A todo plus its client-side identity.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTodo {
    pub cid: Cid,
    pub todo: Todo,
}

/// Change notifications, consumed in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Reset,
    Added(Cid),
    Changed(Cid),
    Removed(Cid),
}

/// The collection of todos known to this client, sorted by `order`
/// ascending. Mutations apply locally first, then persist through the
/// injected backing store; a failed persist puts the collection back the
/// way it was and surfaces the error to the caller.
pub struct TodoStore {
    backend: Box<dyn BackingStore>,
    entries: Vec<StoredTodo>,
    events: VecDeque<StoreEvent>,
    next_cid: u64,
}

impl TodoStore {
    pub fn new(backend: Box<dyn BackingStore>) -> Self {
        Self {
            backend,
            entries: Vec::new(),
            events: VecDeque::new(),
            next_cid: 1,
        }
    }

    /// Replaces the collection with the server's rows and emits `Reset`.
    pub fn fetch_all(&mut self) -> Result<(), PersistenceError> {
        let rows = self.backend.fetch_all()?;
        let mut entries = Vec::with_capacity(rows.len());
        for todo in rows {
            let cid = self.alloc_cid();
            entries.push(StoredTodo { cid, todo });
        }
        self.entries = entries;
        self.sort_entries();
        self.events.push_back(StoreEvent::Reset);
        Ok(())
    }

    /// Creates a todo: merges the draft with the entity defaults, inserts
    /// it optimistically, then persists. On failure the optimistic entry
    /// is dropped again.
    pub fn create(&mut self, draft: TodoDraft) -> Result<Cid, PersistenceError> {
        let order = match draft.order {
            Some(order) => order,
            None => self.next_order(),
        };
        let todo = draft.with_defaults(order);
        let cid = self.alloc_cid();

        self.entries.push(StoredTodo {
            cid,
            todo: todo.clone(),
        });
        self.sort_entries();
        self.events.push_back(StoreEvent::Added(cid));

        // The server receives the fully merged attributes.
        let draft = TodoDraft {
            content: Some(todo.content.clone()),
            order: Some(todo.order),
            done: Some(todo.done),
            due_date: Some(todo.due_date.clone()),
        };
        match self.backend.create(&draft) {
            Ok(saved) => {
                if let Some(entry) = self.entry_mut(cid) {
                    entry.todo = saved;
                }
                self.sort_entries();
                self.events.push_back(StoreEvent::Changed(cid));
                Ok(cid)
            }
            Err(e) => {
                warn!(error = %e, "create failed, dropping optimistic entry");
                self.entries.retain(|entry| entry.cid != cid);
                self.events.push_back(StoreEvent::Removed(cid));
                Err(e)
            }
        }
    }

    /// Applies a patch locally, then persists it. On failure the entity
    /// reverts to its last known-good state.
    pub fn save(&mut self, cid: Cid, patch: TodoPatch) -> Result<(), PersistenceError> {
        let Some(index) = self.index_of(cid) else {
            return Ok(());
        };

        let snapshot = self.entries[index].todo.clone();
        patch.apply_to(&mut self.entries[index].todo);
        let changed = self.entries[index].todo != snapshot;
        if changed {
            self.sort_entries();
            self.events.push_back(StoreEvent::Changed(cid));
        }

        let Some(id) = snapshot.id else {
            if changed {
                self.revert(cid, snapshot);
            }
            return Err(PersistenceError::NeverSaved);
        };

        match self.backend.update(id, &patch) {
            Ok(saved) => {
                let echo_changed = match self.entry_mut(cid) {
                    Some(entry) if entry.todo != saved => {
                        entry.todo = saved;
                        true
                    }
                    _ => false,
                };
                if echo_changed {
                    self.sort_entries();
                    self.events.push_back(StoreEvent::Changed(cid));
                }
                Ok(())
            }
            Err(e) => {
                warn!(?cid, error = %e, "save failed, reverting");
                if changed {
                    self.revert(cid, snapshot);
                }
                Err(e)
            }
        }
    }

    /// Flips `done` and saves it.
    pub fn toggle_done(&mut self, cid: Cid) -> Result<(), PersistenceError> {
        let Some(entry) = self.get(cid) else {
            return Ok(());
        };
        let patch = TodoPatch::done(!entry.todo.done);
        self.save(cid, patch)
    }

    /// Removes the entity optimistically, then destroys it server-side.
    /// On failure the entity comes back.
    pub fn destroy(&mut self, cid: Cid) -> Result<(), PersistenceError> {
        let Some(index) = self.index_of(cid) else {
            return Ok(());
        };
        let entry = self.entries.remove(index);
        self.events.push_back(StoreEvent::Removed(cid));

        let Some(id) = entry.todo.id else {
            // Never persisted, nothing to destroy remotely.
            return Ok(());
        };
        match self.backend.destroy(id) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(?cid, error = %e, "destroy failed, restoring entry");
                self.entries.push(entry);
                self.sort_entries();
                self.events.push_back(StoreEvent::Added(cid));
                Err(e)
            }
        }
    }

    /// Saves `done` onto every entity, one at a time. Entities that fail
    /// are reverted and reported; the rest keep their new state.
    pub fn toggle_all(&mut self, done: bool) -> Vec<(Cid, PersistenceError)> {
        let cids: Vec<Cid> = self.entries.iter().map(|entry| entry.cid).collect();
        let mut failures = Vec::new();
        for cid in cids {
            if let Err(e) = self.save(cid, TodoPatch::done(done)) {
                failures.push((cid, e));
            }
        }
        failures
    }

    /// Destroys every completed entity, one at a time, reporting failures.
    pub fn clear_completed(&mut self) -> Vec<(Cid, PersistenceError)> {
        let cids: Vec<Cid> = self
            .entries
            .iter()
            .filter(|entry| entry.todo.done)
            .map(|entry| entry.cid)
            .collect();
        let mut failures = Vec::new();
        for cid in cids {
            if let Err(e) = self.destroy(cid) {
                failures.push((cid, e));
            }
        }
        failures
    }

    pub fn done(&self) -> Vec<&StoredTodo> {
        self.entries.iter().filter(|e| e.todo.done).collect()
    }

    pub fn remaining(&self) -> Vec<&StoredTodo> {
        self.entries.iter().filter(|e| !e.todo.done).collect()
    }

    /// 1 for an empty collection, one past the last entity otherwise.
    /// The entries are sorted, so the last one carries the highest order.
    pub fn next_order(&self) -> i64 {
        self.entries.last().map_or(1, |e| e.todo.order + 1)
    }

    pub fn entries(&self) -> &[StoredTodo] {
        &self.entries
    }

    pub fn get(&self, cid: Cid) -> Option<&StoredTodo> {
        self.entries.iter().find(|e| e.cid == cid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drains the queued notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<StoreEvent> {
        self.events.drain(..).collect()
    }

    fn alloc_cid(&mut self) -> Cid {
        let cid = Cid(self.next_cid);
        self.next_cid += 1;
        cid
    }

    fn sort_entries(&mut self) {
        self.entries.sort_by_key(|e| e.todo.order);
    }

    fn index_of(&self, cid: Cid) -> Option<usize> {
        self.entries.iter().position(|e| e.cid == cid)
    }

    fn entry_mut(&mut self, cid: Cid) -> Option<&mut StoredTodo> {
        self.entries.iter_mut().find(|e| e.cid == cid)
    }

    fn revert(&mut self, cid: Cid, snapshot: Todo) {
        if let Some(entry) = self.entry_mut(cid) {
            entry.todo = snapshot;
        }
        self.sort_entries();
        self.events.push_back(StoreEvent::Changed(cid));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use chrono::{Duration, Local};
    use domain::DueDate;

    struct FlakyStore {
        inner: MemoryStore,
        fail_creates: bool,
        fail_update_ids: Vec<i64>,
        fail_destroy_ids: Vec<i64>,
    }

    impl FlakyStore {
        fn reliable(inner: MemoryStore) -> Self {
            Self {
                inner,
                fail_creates: false,
                fail_update_ids: Vec::new(),
                fail_destroy_ids: Vec::new(),
            }
        }

        fn down() -> PersistenceError {
            PersistenceError::Transport("wire down".to_string())
        }
    }

    impl BackingStore for FlakyStore {
        fn fetch_all(&mut self) -> Result<Vec<Todo>, PersistenceError> {
            self.inner.fetch_all()
        }

        fn create(&mut self, draft: &TodoDraft) -> Result<Todo, PersistenceError> {
            if self.fail_creates {
                return Err(Self::down());
            }
            self.inner.create(draft)
        }

        fn update(&mut self, id: i64, patch: &TodoPatch) -> Result<Todo, PersistenceError> {
            if self.fail_update_ids.contains(&id) {
                return Err(Self::down());
            }
            self.inner.update(id, patch)
        }

        fn destroy(&mut self, id: i64) -> Result<Todo, PersistenceError> {
            if self.fail_destroy_ids.contains(&id) {
                return Err(Self::down());
            }
            self.inner.destroy(id)
        }
    }

    fn row(id: i64, content: &str, order: i64, done: bool) -> Todo {
        Todo {
            id: Some(id),
            content: content.to_string(),
            order,
            done,
            due_date: DueDate::Wire("2030-06-05T12:00:00Z".to_string()),
        }
    }

    fn store_with(rows: Vec<Todo>) -> TodoStore {
        let mut store = TodoStore::new(Box::new(MemoryStore::with_rows(rows)));
        store.fetch_all().unwrap();
        store.take_events();
        store
    }

    #[test]
    fn fetch_all_sorts_by_order_and_resets() {
        let rows = vec![row(1, "b", 2, false), row(2, "a", 1, false)];
        let mut store = TodoStore::new(Box::new(MemoryStore::with_rows(rows)));
        store.fetch_all().unwrap();

        assert_eq!(store.take_events(), vec![StoreEvent::Reset]);
        let orders: Vec<i64> = store.entries().iter().map(|e| e.todo.order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn create_fills_defaults_and_keeps_server_echo() {
        let mut store = TodoStore::new(Box::new(MemoryStore::new()));

        let before = Local::now().naive_local() + Duration::hours(24);
        let cid = store.create(TodoDraft::with_content("buy milk")).unwrap();
        let after = Local::now().naive_local() + Duration::hours(24);

        let entry = store.get(cid).unwrap();
        assert_eq!(entry.todo.id, Some(1));
        assert_eq!(entry.todo.content, "buy milk");
        assert_eq!(entry.todo.order, 1);
        assert!(!entry.todo.done);

        let due = entry.todo.due_date.normalize().unwrap();
        assert!(due >= before - Duration::seconds(1));
        assert!(due <= after + Duration::seconds(1));

        assert_eq!(
            store.take_events(),
            vec![StoreEvent::Added(cid), StoreEvent::Changed(cid)]
        );
    }

    #[test]
    fn create_empty_content_gets_placeholder() {
        let mut store = TodoStore::new(Box::new(MemoryStore::new()));
        let cid = store.create(TodoDraft::with_content("")).unwrap();
        assert_eq!(store.get(cid).unwrap().todo.content, "empty todo...");
    }

    #[test]
    fn create_failure_drops_optimistic_entry() {
        let backend = FlakyStore {
            fail_creates: true,
            ..FlakyStore::reliable(MemoryStore::new())
        };
        let mut store = TodoStore::new(Box::new(backend));

        let err = store.create(TodoDraft::with_content("x")).unwrap_err();
        assert!(matches!(err, PersistenceError::Transport(_)));
        assert!(store.is_empty());

        let events = store.take_events();
        assert!(matches!(events[..], [StoreEvent::Added(a), StoreEvent::Removed(b)] if a == b));
    }

    #[test]
    fn next_order_is_one_then_last_plus_one() {
        let mut store = TodoStore::new(Box::new(MemoryStore::new()));
        assert_eq!(store.next_order(), 1);

        store.create(TodoDraft::with_content("a")).unwrap();
        let draft = TodoDraft {
            order: Some(7),
            ..TodoDraft::with_content("b")
        };
        store.create(draft).unwrap();
        assert_eq!(store.next_order(), 8);
    }

    #[test]
    fn done_and_remaining_partition_the_collection() {
        let store = store_with(vec![
            row(1, "a", 1, false),
            row(2, "b", 2, true),
            row(3, "c", 3, false),
        ]);

        let done: Vec<i64> = store.done().iter().map(|e| e.todo.order).collect();
        let remaining: Vec<i64> = store.remaining().iter().map(|e| e.todo.order).collect();
        assert_eq!(done, vec![2]);
        assert_eq!(remaining, vec![1, 3]);
        assert_eq!(done.len() + remaining.len(), store.len());
    }

    #[test]
    fn toggle_done_round_trips_to_backend() {
        let mut store = store_with(vec![row(1, "a", 1, false)]);
        let cid = store.entries()[0].cid;

        store.toggle_done(cid).unwrap();
        assert!(store.get(cid).unwrap().todo.done);
        assert_eq!(store.take_events(), vec![StoreEvent::Changed(cid)]);

        store.toggle_done(cid).unwrap();
        assert!(!store.get(cid).unwrap().todo.done);
    }

    #[test]
    fn save_failure_reverts_and_notifies() {
        let rows = vec![row(1, "keep", 1, false)];
        let backend = FlakyStore {
            fail_update_ids: vec![1],
            ..FlakyStore::reliable(MemoryStore::with_rows(rows))
        };
        let mut store = TodoStore::new(Box::new(backend));
        store.fetch_all().unwrap();
        store.take_events();
        let cid = store.entries()[0].cid;

        let err = store.save(cid, TodoPatch::content("new")).unwrap_err();
        assert!(matches!(err, PersistenceError::Transport(_)));
        assert_eq!(store.get(cid).unwrap().todo.content, "keep");
        assert_eq!(
            store.take_events(),
            vec![StoreEvent::Changed(cid), StoreEvent::Changed(cid)]
        );
    }

    #[test]
    fn destroy_failure_restores_entry() {
        let rows = vec![row(1, "stays", 1, false)];
        let backend = FlakyStore {
            fail_destroy_ids: vec![1],
            ..FlakyStore::reliable(MemoryStore::with_rows(rows))
        };
        let mut store = TodoStore::new(Box::new(backend));
        store.fetch_all().unwrap();
        store.take_events();
        let cid = store.entries()[0].cid;

        store.destroy(cid).unwrap_err();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(cid).unwrap().todo.content, "stays");
        assert_eq!(
            store.take_events(),
            vec![StoreEvent::Removed(cid), StoreEvent::Added(cid)]
        );
    }

    #[test]
    fn toggle_all_saves_every_entity_individually() {
        let mut store = store_with(vec![
            row(1, "a", 1, false),
            row(2, "b", 2, true),
            row(3, "c", 3, false),
        ]);

        let failures = store.toggle_all(true);
        assert!(failures.is_empty());
        assert!(store.entries().iter().all(|e| e.todo.done));
        // Only the two entities that actually flipped notify.
        assert_eq!(store.take_events().len(), 2);
    }

    #[test]
    fn toggle_all_reports_partial_failures() {
        let rows = vec![
            row(1, "a", 1, false),
            row(2, "b", 2, false),
            row(3, "c", 3, false),
        ];
        let backend = FlakyStore {
            fail_update_ids: vec![2],
            ..FlakyStore::reliable(MemoryStore::with_rows(rows))
        };
        let mut store = TodoStore::new(Box::new(backend));
        store.fetch_all().unwrap();

        let failures = store.toggle_all(true);
        assert_eq!(failures.len(), 1);
        // The failed entity reverted, the others kept their new state.
        assert_eq!(store.done().len(), 2);
        assert_eq!(store.remaining().len(), 1);
    }

    #[test]
    fn clear_completed_destroys_only_done_entities() {
        let mut store = store_with(vec![
            row(1, "a", 1, true),
            row(2, "b", 2, false),
            row(3, "c", 3, true),
        ]);

        let failures = store.clear_completed();
        assert!(failures.is_empty());
        assert_eq!(store.len(), 1);
        assert!(store.done().is_empty());
        assert_eq!(store.entries()[0].todo.content, "b");
    }
}
