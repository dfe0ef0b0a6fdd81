//! Watch event filtering ahead of the work queue

use kube::runtime::watcher;
use kube::Resource;

/// Predicate deciding which delete events trigger a reconcile.
///
/// Created and updated objects always pass. Deletes pass by default.
pub struct EventFilter<K> {
    delete: fn(&K) -> bool,
}

impl<K> Clone for EventFilter<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for EventFilter<K> {}

impl<K> Default for EventFilter<K> {
    fn default() -> Self {
        Self { delete: pass }
    }
}

fn pass<K>(_: &K) -> bool {
    true
}

/// True when the object carries a deletion timestamp
pub fn has_deletion_timestamp<K: Resource>(obj: &K) -> bool {
    obj.meta().deletion_timestamp.is_some()
}

impl<K> EventFilter<K> {
    /// Predicate for deleted objects
    pub fn on_delete(mut self, predicate: fn(&K) -> bool) -> Self {
        self.delete = predicate;
        self
    }

    /// The object to enqueue for `event`, if it passes
    pub fn admit(&self, event: watcher::Event<K>) -> Option<K> {
        match event {
            watcher::Event::Apply(obj) | watcher::Event::InitApply(obj) => Some(obj),
            watcher::Event::Delete(obj) => (self.delete)(&obj).then_some(obj),
            watcher::Event::Init | watcher::Event::InitDone => None,
        }
    }
}

impl<K: Resource> EventFilter<K> {
    /// Pass deletes only when the deleted object has a deletion timestamp
    pub fn deletions_with_timestamp() -> Self {
        Self::default().on_delete(has_deletion_timestamp::<K>)
    }
}
