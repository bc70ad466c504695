//! Small-integer handles for ephemeral debuggee objects.

use std::collections::HashMap;

use crate::channel::Handle;

/// Maps handles to values that are only valid while the debuggee stays
/// stopped.
///
/// Handles start at 1 and increase by one per insertion. [`clear`]
/// drops every entry and restarts numbering, so a handle issued before a
/// clear never resolves to the value it was issued for.
///
/// [`clear`]: ObjectRegistry::clear
#[derive(Debug)]
pub struct ObjectRegistry<T> {
    entries: HashMap<Handle, T>,
    next: Handle,
}

impl<T> Default for ObjectRegistry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next: 1,
        }
    }
}

impl<T> ObjectRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and return its handle.
    pub fn insert(&mut self, value: T) -> Handle {
        let handle = self.next;
        self.next += 1;
        self.entries.insert(handle, value);
        handle
    }

    /// Look up a handle.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.entries.get(&handle)
    }

    /// Drop every entry and restart numbering at 1.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next = 1;
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
