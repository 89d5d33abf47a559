use std::fmt::Debug;

/// Index-addressed growable store.
///
/// Nodes and points live in one `List` each and refer to one another by
/// index, so subdivision never moves ownership around. Entries are never
/// erased; the tree only grows until it is cleared.
#[derive(Clone, Debug)]
pub(crate) struct List<T> {
    data: Vec<T>,
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self::with_capacity(128)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> &T {
        debug_assert!(index < self.data.len());
        &self.data[index]
    }

    pub fn try_get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.data.len());
        &mut self.data[index]
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Appends `element` and returns its index.
    pub fn push(&mut self, element: T) -> usize {
        let index = self.data.len();
        self.data.push(element);
        index
    }

    pub fn pop(&mut self) -> Option<T> {
        self.data.pop()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}
