/*!

A growable collection of object references used to answer bulk queries
("all objects of class X", child enumerations, filtered listings). The
ordering mode is fixed when the set is created: identifier order with
binary-search membership, or pure insertion order.

*/

use crate::filter::{sort_compare, Filter, SortKey};
use crate::object::ObjectRef;
use crate::registry::Registry;
use crate::uuid::Uuid;

pub struct ObjectSet {
    items: Vec<ObjectRef>,
    sorted: bool,
}

impl ObjectSet {
    /// An insertion-ordered set.
    pub fn new() -> Self {
        ObjectSet {
            items: Vec::new(),
            sorted: false,
        }
    }

    /// An identifier-ordered set with binary-search membership; duplicate
    /// identifiers are rejected on add.
    pub fn new_sorted() -> Self {
        ObjectSet {
            items: Vec::new(),
            sorted: true,
        }
    }

    fn position(&self, uuid: Uuid) -> Result<usize, usize> {
        debug_assert!(self.sorted);
        self.items
            .binary_search_by(|probe| probe.borrow().uuid().cmp(&uuid))
    }

    /// Adds an object, unless a filter is given and rejects it. Returns
    /// whether the object was added.
    pub fn add(&mut self, obj: &ObjectRef, filter: Option<&Filter>) -> bool {
        if let Some(filter) = filter {
            if !filter.matches(&*obj.borrow()) {
                return false;
            }
        }
        if self.sorted {
            match self.position(obj.borrow().uuid()) {
                Ok(_) => return false,
                Err(at) => self.items.insert(at, obj.clone()),
            }
        } else {
            self.items.push(obj.clone());
        }
        true
    }

    pub fn exists(&self, uuid: Uuid) -> bool {
        if self.sorted {
            self.position(uuid).is_ok()
        } else {
            self.items.iter().any(|o| o.borrow().uuid() == uuid)
        }
    }

    pub fn remove(&mut self, uuid: Uuid) -> Option<ObjectRef> {
        let at = if self.sorted {
            self.position(uuid).ok()?
        } else {
            self.items.iter().position(|o| o.borrow().uuid() == uuid)?
        };
        Some(self.items.remove(at))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ObjectRef> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObjectRef> {
        self.items.iter()
    }

    pub fn uuids(&self) -> Vec<Uuid> {
        self.items.iter().map(|o| o.borrow().uuid()).collect()
    }

    /// Sorts by a property key. Insertion-ordered sets give up their
    /// insertion order; identifier-ordered sets give up identifier order.
    pub fn sort(&mut self, key: &SortKey) {
        self.items
            .sort_by(|a, b| sort_compare(key, &*a.borrow(), &*b.borrow()));
    }

    /// Sorts by computed display title.
    pub fn sort_by_title(&mut self, registry: &Registry) {
        let mut decorated: Vec<(String, ObjectRef)> = self
            .items
            .drain(..)
            .map(|o| (registry.object_title(&o), o))
            .collect();
        decorated.sort_by(|a, b| a.0.cmp(&b.0));
        self.items = decorated.into_iter().map(|(_, o)| o).collect();
    }
}

impl Default for ObjectSet {
    fn default() -> Self {
        ObjectSet::new()
    }
}

impl<'a> IntoIterator for &'a ObjectSet {
    type Item = &'a ObjectRef;
    type IntoIter = std::slice::Iter<'a, ObjectRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
