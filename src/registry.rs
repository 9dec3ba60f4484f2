/*!

The `Registry` is the engine's context object. All engine state — the
identifier index, the class name index, the root-class domains, the link
table, the notification queue — lives on one explicit instance rather than in
file-scope globals, so tests (and in principle multiple independent backends)
can each own their own.

The global index and the per-root-class domains are `BTreeMap`s keyed by the
16-byte identifier, so enumeration is always in identifier order and bulk
listings are deterministic run to run.

Concurrency contract: the engine performs no internal locking. Every
operation assumes the caller already holds the process-wide exclusive lock;
the `Rc`/`RefCell` interior means the type system refuses to share a
`Registry` across threads without such a wrapper.

*/

use std::cell::RefCell;
use std::collections::BTreeMap;

use bitflags::bitflags;
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::class::{ObjectClass, ReorderDirection};
use crate::error::TvCoreError;
use crate::events::{NotificationQueue, ObjectEvent, Subscriber};
use crate::filter::Filter;
use crate::hash::HashMap;
use crate::link::{partners_to_notify, LinkTable};
use crate::object::ObjectRef;
use crate::persist::{ConfigMap, RegistryPersistExt};
use crate::set::ObjectSet;
use crate::uuid::Uuid;

bitflags! {
    /// Registration options.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct InsertFlags: u32 {
        /// Guarantee the legacy 31-bit short identifier is unique among live
        /// objects of the same root class.
        const SHORT_UUID = 1 << 0;
    }
}

/// Bound on identifier regeneration. Five consecutive collisions of a
/// 128-bit random identifier mean the generator is broken, not bad luck.
const IDENTIFIER_RETRY_LIMIT: u32 = 5;

pub struct Registry {
    /// All live objects, in identifier order.
    nodes: RefCell<BTreeMap<Uuid, ObjectRef>>,
    /// Root class name -> the objects of that lineage, in identifier order.
    /// A domain appears the first time an object of the lineage registers.
    domains: RefCell<HashMap<&'static str, BTreeMap<Uuid, ObjectRef>>>,
    /// Class name -> descriptor; first registration of a name wins.
    classes: RefCell<HashMap<&'static str, &'static ObjectClass>>,
    pub(crate) links: RefCell<LinkTable>,
    pub(crate) notifications: NotificationQueue,
    rng: RefCell<Box<dyn RngCore>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::with_rng(Box::new(StdRng::from_os_rng()))
    }

    /// A registry with an injected identifier generator, for deterministic
    /// tests (forced collisions, reproducible identifiers).
    pub fn with_rng(rng: Box<dyn RngCore>) -> Self {
        Registry {
            nodes: RefCell::new(BTreeMap::new()),
            domains: RefCell::new(HashMap::default()),
            classes: RefCell::new(HashMap::default()),
            links: RefCell::new(LinkTable::default()),
            notifications: NotificationQueue::default(),
            rng: RefCell::new(rng),
        }
    }

    // ----------------------------------------------------------- classes

    /// Walks the parent chain and records each class by name exactly once.
    /// Re-registration of a known name is a silent no-op; classes are
    /// immutable singletons supplied by collaborators.
    pub fn register_class(&self, class: &'static ObjectClass) {
        let mut classes = self.classes.borrow_mut();
        for c in class.chain() {
            classes.entry(c.name).or_insert_with(|| {
                trace!("registered class '{}'", c.name);
                c
            });
        }
    }

    pub fn class(&self, name: &str) -> Option<&'static ObjectClass> {
        self.classes.borrow().get(name).copied()
    }

    /// Every registered class, in name order.
    pub fn classes(&self) -> Vec<&'static ObjectClass> {
        let mut all: Vec<_> = self.classes.borrow().values().copied().collect();
        all.sort_by_key(|c| c.name);
        all
    }

    // ------------------------------------------------------ registration

    fn identifier_is_free(
        &self,
        candidate: Uuid,
        root: &'static str,
        flags: InsertFlags,
    ) -> bool {
        if self.nodes.borrow().contains_key(&candidate) {
            return false;
        }
        if flags.contains(InsertFlags::SHORT_UUID) {
            if let Some(domain) = self.domains.borrow().get(root) {
                if domain.keys().any(|u| u.short() == candidate.short()) {
                    return false;
                }
            }
        }
        true
    }

    /// Registers an object: assigns or validates its identifier, inserts it
    /// into the global index and its root-class domain, optionally loads its
    /// properties from `conf` (silently, as trusted initial construction),
    /// and queues a create notification.
    ///
    /// A supplied identifier must parse and be free, or nothing is inserted
    /// and the caller keeps responsibility for the allocation. A generated
    /// identifier that collides is regenerated, at most
    /// `IDENTIFIER_RETRY_LIMIT` times; exhaustion panics, as proof of a
    /// corrupted invariant rather than a recoverable condition.
    pub fn register(
        &self,
        obj: &ObjectRef,
        uuid: Option<&str>,
        flags: InsertFlags,
        conf: Option<&ConfigMap>,
    ) -> Result<Uuid, TvCoreError> {
        let class = obj.borrow().object_class();
        self.register_class(class);
        let root = class.root().name;

        let assigned = match uuid {
            Some(hex) => {
                let candidate = Uuid::from_hex(hex)?;
                if !self.identifier_is_free(candidate, root, flags) {
                    return Err(TvCoreError::DuplicateUuid(hex.to_string()));
                }
                candidate
            }
            None => {
                let mut attempt = 0;
                loop {
                    let candidate = Uuid::random(self.rng.borrow_mut().as_mut());
                    if self.identifier_is_free(candidate, root, flags) {
                        break candidate;
                    }
                    attempt += 1;
                    warn!(
                        "identifier collision for class '{}', retrying ({attempt}/{IDENTIFIER_RETRY_LIMIT})",
                        class.name
                    );
                    if attempt >= IDENTIFIER_RETRY_LIMIT {
                        panic!(
                            "identifier collision retry limit exhausted for class '{}'",
                            class.name
                        );
                    }
                }
            }
        };

        obj.borrow_mut().set_uuid(assigned);
        self.nodes.borrow_mut().insert(assigned, obj.clone());
        self.domains
            .borrow_mut()
            .entry(root)
            .or_default()
            .insert(assigned, obj.clone());

        if let Some(conf) = conf {
            self.load(obj, conf);
        }

        debug!("registered {} '{}'", class.name, assigned.hex());
        self.queue_event(class, ObjectEvent::Created {
            uuid: assigned,
            class: class.name,
        });
        Ok(assigned)
    }

    /// Removes the object from both indices, severs its relationship links
    /// (notifying surviving persist-flagged partners), and queues a delete
    /// notification. The caller disposes of the owning allocation by
    /// dropping its own reference.
    pub fn unregister(&self, uuid: Uuid) {
        let Some(obj) = self.nodes.borrow_mut().remove(&uuid) else {
            debug!("unregister of unknown object '{}'", uuid.hex());
            return;
        };
        let class = obj.borrow().object_class();
        if let Some(domain) = self.domains.borrow_mut().get_mut(class.root().name) {
            domain.remove(&uuid);
        }

        let severed = self.links.borrow_mut().remove_all_of(uuid);
        for partner in partners_to_notify(&severed, Some(uuid)) {
            self.object_changed_by_uuid(partner);
        }

        debug!("unregistered {} '{}'", class.name, uuid.hex());
        self.queue_event(class, ObjectEvent::Deleted { uuid });
    }

    // ------------------------------------------------------------ lookup

    /// Global lookup, optionally restricted to instances of a class.
    pub fn find(&self, uuid: Uuid, class: Option<&ObjectClass>) -> Option<ObjectRef> {
        let obj = self.nodes.borrow().get(&uuid).cloned()?;
        if let Some(class) = class {
            if !obj.borrow().object_class().is_instance(class) {
                return None;
            }
        }
        Some(obj)
    }

    /// Lookup from the hex wire form.
    pub fn find_hex(&self, uuid: &str, class: Option<&ObjectClass>) -> Option<ObjectRef> {
        self.find(Uuid::from_hex(uuid).ok()?, class)
    }

    /// All objects of the class (including subclasses), in identifier order,
    /// optionally filtered.
    pub fn find_all(&self, class: &'static ObjectClass, filter: Option<&Filter>) -> ObjectSet {
        let mut set = ObjectSet::new();
        let domains = self.domains.borrow();
        if let Some(domain) = domains.get(class.root().name) {
            for obj in domain.values() {
                if obj.borrow().object_class().is_instance(class) {
                    set.add(obj, filter);
                }
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    // ------------------------------------------------------------- hooks

    /// The computed display title, falling back to the hex identifier when
    /// no class on the chain overrides the title hook.
    pub fn object_title(&self, obj: &ObjectRef) -> String {
        let guard = obj.borrow();
        let class = guard.object_class();
        class
            .resolve_title(&*guard)
            .unwrap_or_else(|| guard.uuid().hex())
    }

    /// The changed path: runs the changed and save hooks and queues a change
    /// notification. Domain code calls this after mutating an object outside
    /// the property update paths.
    pub fn object_changed(&self, obj: &ObjectRef) {
        let uuid;
        let class;
        {
            let guard = obj.borrow();
            uuid = guard.uuid();
            class = guard.object_class();
            class.invoke_changed(self, &*guard);
            class.invoke_save(self, &*guard);
        }
        self.queue_event(class, ObjectEvent::Changed { uuid });
    }

    pub(crate) fn object_changed_by_uuid(&self, uuid: Uuid) {
        if let Some(obj) = self.find(uuid, None) {
            self.object_changed(&obj);
        }
    }

    /// Runs the save hook chain. Returns whether any class handled it.
    pub fn object_save(&self, obj: &ObjectRef) -> bool {
        let guard = obj.borrow();
        guard.object_class().invoke_save(self, &*guard)
    }

    /// Runs the delete hook chain; a chain with no delete override falls
    /// back to plain unregistration.
    pub fn object_delete(&self, obj: &ObjectRef) {
        let uuid;
        let handled;
        {
            let guard = obj.borrow();
            uuid = guard.uuid();
            handled = guard.object_class().invoke_delete(self, &*guard);
        }
        if !handled {
            self.unregister(uuid);
        }
    }

    /// Permission check; a chain with no permission hook allows everything.
    pub fn object_perm(&self, obj: &ObjectRef, access: u32) -> Result<(), TvCoreError> {
        let guard = obj.borrow();
        guard.object_class().resolve_perm(&*guard, access)
    }

    pub fn object_reorder(&self, obj: &ObjectRef, direction: ReorderDirection) -> bool {
        let guard = obj.borrow();
        guard.object_class().invoke_reorder(self, &*guard, direction)
    }

    pub fn object_childs(&self, obj: &ObjectRef) -> Option<ObjectSet> {
        let guard = obj.borrow();
        guard.object_class().resolve_childs(self, &*guard)
    }

    pub fn object_is_leaf(&self, obj: &ObjectRef) -> bool {
        let class = obj.borrow().object_class();
        if class.chain_flags(crate::class::ClassFlags::LEAF) {
            return true;
        }
        self.object_childs(obj).is_none()
    }

    // ----------------------------------------------------- notifications

    pub fn subscribe(&self, subscriber: Subscriber) {
        self.notifications.subscribe(subscriber);
    }

    /// Delivers the queued (delayed, coalesced) notifications in order.
    pub fn flush_notifications(&self) {
        self.notifications.flush(self);
    }

    /// Queues a title-change notification with the computed title.
    pub fn notify_title_changed(&self, obj: &ObjectRef) {
        let uuid = obj.borrow().uuid();
        let class = obj.borrow().object_class();
        let title = self.object_title(obj);
        self.queue_event(class, ObjectEvent::TitleChanged { uuid, title });
    }

    /// Classes whose objects are not individually addressable collapse all
    /// per-object events into a whole-collection reload signal.
    pub(crate) fn queue_event(&self, class: &'static ObjectClass, event: ObjectEvent) {
        if class.chain_flags(crate::class::ClassFlags::RELOAD) {
            self.notifications.push(ObjectEvent::Reload {
                event: class.event_name(),
            });
        } else {
            self.notifications.push(event);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}
