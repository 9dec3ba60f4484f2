//! The generic object core of a TV-recording and streaming backend
//!
//! Every configurable thing in such a backend — channels, tags, bouquets,
//! profiles, recorder configurations — is an *object* managed by one shared
//! engine. The engine provides:
//!
//! * 16-byte unique identifiers with a fixed hex wire form (and a legacy
//!   31-bit short form unique within a root class)
//! * class-based reflection: single-inheritance class descriptors carrying
//!   ordered property lists and override hooks, resolved by walking the
//!   ancestry chain
//! * typed property access through accessor functions, never memory layout
//! * symmetric many-to-many relationship links with bulk reconciliation
//! * filter/sort query evaluation driven purely by property descriptors
//! * a persistence bridge to an ordered key-value map format, with change
//!   tracking and save hooks
//! * create/change/delete notifications for UI and API subscribers
//!
//! All state lives on an explicit [`Registry`] instance; the crate performs
//! no I/O and no locking of its own. Every operation is a bounded,
//! synchronous, in-memory computation, and mutating calls assume the caller
//! holds the process-wide exclusive lock — the `Rc`/`RefCell` interior makes
//! the single-writer contract a compile-time property rather than a comment.
//!
//! A domain module participates by declaring a static [`ObjectClass`] and
//! implementing [`Object`] (usually via [`impl_object!`]):
//!
//! ```rust,ignore
//! static CHANNEL_CLASS: ObjectClass = ObjectClass { /* ... */ };
//!
//! impl_object!(Channel {
//!     uuid: id,
//!     class: &CHANNEL_CLASS,
//!     aspects: [OutputState => base],
//! });
//!
//! let registry = Registry::new();
//! let channel: ObjectRef = Rc::new(RefCell::new(Channel::default()));
//! registry.register(&channel, None, InsertFlags::SHORT_UUID, Some(&conf))?;
//! ```

pub mod class;
pub mod describe;
pub mod error;
pub mod events;
pub mod filter;
pub mod hash;
pub mod link;
pub mod object;
pub mod persist;
pub mod property;
pub mod registry;
pub mod set;
pub mod uuid;

#[cfg(test)]
pub(crate) mod testing;

// Flatten the module hierarchy.
pub use class::{ClassFlags, ClassHooks, NoHooks, ObjectClass, ReorderDirection, NO_HOOKS};
pub use describe::{ClassDescription, ObjectDescription, ObjectParam, PropertyDescription};
pub use error::TvCoreError;
pub use events::{ObjectEvent, Subscriber};
pub use filter::{Comparator, Filter, SortKey};
pub use hash::{HashMap, HashSet};
pub use link::Side;
pub use object::{aspect_mut, aspect_ref, Object, ObjectRef};
pub use persist::{ConfigMap, RegistryPersistExt};
pub use property::{
    GetFn, ListEntry, ListFn, NotifyFn, Property, PropertyFlags, PropertyGroup, PropertyType,
    RendFn, SetFn,
};
pub use registry::{InsertFlags, Registry};
pub use set::ObjectSet;
pub use uuid::Uuid;
