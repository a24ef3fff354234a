//! List state owned by a single resource controller.
//!
//! Each controller fetches its own list and replaces it wholesale after every
//! committed mutation; no two controllers share one. In-flight flags let a UI
//! disable the control that triggered a request until it settles.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use orgkit_core::Entity;

/// Kind of mutation tracked by an in-flight flag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    Verify,
    Associate,
}

#[derive(Debug)]
struct ListState<T> {
    items: Vec<T>,
    loaded: bool,
    loading: usize,
    in_flight: HashMap<MutationKind, usize>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loaded: false,
            loading: 0,
            in_flight: HashMap::new(),
        }
    }
}

/// Last fetched list plus loading/in-flight flags.
#[derive(Debug)]
pub struct ResourceList<T> {
    state: RwLock<ListState<T>>,
}

impl<T> Default for ResourceList<T> {
    fn default() -> Self {
        Self {
            state: RwLock::new(ListState::default()),
        }
    }
}

/// Clears its flag when dropped.
#[must_use = "the flag is cleared as soon as the guard is dropped"]
#[derive(Debug)]
pub struct InFlight<'a, T> {
    list: &'a ResourceList<T>,
    kind: Option<MutationKind>,
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        let mut state = self.list.write();
        match self.kind {
            Some(kind) => {
                if let Some(count) = state.in_flight.get_mut(&kind) {
                    *count = count.saturating_sub(1);
                }
            }
            None => state.loading = state.loading.saturating_sub(1),
        }
    }
}

impl<T> ResourceList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, ListState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ListState<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the list with a fresh server response.
    pub fn replace(&self, items: Vec<T>) {
        let mut state = self.write();
        state.items = items;
        state.loaded = true;
    }

    /// Mark a fetch as in progress.
    pub fn begin_load(&self) -> InFlight<'_, T> {
        self.write().loading += 1;
        InFlight {
            list: self,
            kind: None,
        }
    }

    /// Mark a mutation of `kind` as in progress.
    pub fn begin(&self, kind: MutationKind) -> InFlight<'_, T> {
        *self.write().in_flight.entry(kind).or_default() += 1;
        InFlight {
            list: self,
            kind: Some(kind),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading > 0
    }

    /// Whether at least one fetch has completed.
    pub fn is_loaded(&self) -> bool {
        self.read().loaded
    }

    pub fn is_busy(&self, kind: MutationKind) -> bool {
        self.read().in_flight.get(&kind).is_some_and(|n| *n > 0)
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }
}

impl<T: Clone> ResourceList<T> {
    /// Snapshot of the current items.
    pub fn items(&self) -> Vec<T> {
        self.read().items.clone()
    }

    pub fn first(&self) -> Option<T> {
        self.read().items.first().cloned()
    }
}

impl<T: Entity + Clone> ResourceList<T> {
    pub fn find(&self, id: &T::Id) -> Option<T> {
        self.read().items.iter().find(|item| item.id() == id).cloned()
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.read().items.iter().any(|item| item.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        name: &'static str,
    }

    impl Entity for Row {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    #[test]
    fn replace_swaps_the_whole_list() {
        let list = ResourceList::new();
        assert!(!list.is_loaded());
        list.replace(vec![Row { id: 1, name: "a" }, Row { id: 2, name: "b" }]);
        list.replace(vec![Row { id: 3, name: "c" }]);

        assert!(list.is_loaded());
        assert_eq!(list.len(), 1);
        assert_eq!(list.find(&3).map(|r| r.name), Some("c"));
        assert!(!list.contains(&1));
    }

    #[test]
    fn in_flight_flags_clear_on_drop() {
        let list: ResourceList<Row> = ResourceList::new();
        {
            let _first = list.begin(MutationKind::Delete);
            let second = list.begin(MutationKind::Delete);
            assert!(list.is_busy(MutationKind::Delete));
            assert!(!list.is_busy(MutationKind::Create));
            drop(second);
            assert!(list.is_busy(MutationKind::Delete));
        }
        assert!(!list.is_busy(MutationKind::Delete));
    }

    #[test]
    fn loading_flag_tracks_fetches() {
        let list: ResourceList<Row> = ResourceList::new();
        let guard = list.begin_load();
        assert!(list.is_loading());
        drop(guard);
        assert!(!list.is_loading());
    }
}
