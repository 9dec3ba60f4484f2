/*!

Class descriptors. Every domain module supplies one static `ObjectClass` per
entity type: a process-unique name, an optional parent class (single
inheritance), an ordered property list, and behavior hooks. The engine only
ever reads these descriptors; it never constructs one.

Override dispatch is single-inheritance virtual dispatch without a language
object model: the hook slots are a trait, [`ClassHooks`], whose default
methods mean "not overridden at this class, keep walking". Resolution picks
the first class on the ancestry chain whose hook reports a result; later
(more general) classes are a fallback, never a second call.

*/

use bitflags::bitflags;

use crate::error::TvCoreError;
use crate::object::Object;
use crate::property::{Property, PropertyGroup};
use crate::registry::Registry;
use crate::set::ObjectSet;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct ClassFlags: u32 {
        /// Instances never enumerate children, regardless of hooks.
        const LEAF   = 1 << 0;
        /// Instances are not individually addressable by external consumers;
        /// notifications collapse into a whole-class reload signal.
        const RELOAD = 1 << 1;
    }
}

/// Direction argument of the reorder hook.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReorderDirection {
    Up,
    Down,
}

/// Override hooks of a class. Default implementations report "not handled"
/// so that resolution falls through to the parent class.
pub trait ClassHooks {
    /// Computed display title. `None` falls through; an unresolved chain
    /// falls back to the hex identifier.
    fn title(&self, _obj: &dyn Object) -> Option<String> {
        None
    }

    /// Persist the object. Returns whether this class handled the save.
    fn save(&self, _registry: &Registry, _obj: &dyn Object) -> bool {
        false
    }

    /// Tear the object down (expected to unregister it). Returns whether
    /// this class handled the delete.
    fn delete(&self, _registry: &Registry, _obj: &dyn Object) -> bool {
        false
    }

    /// Reacts to "something about this object changed".
    fn changed(&self, _registry: &Registry, _obj: &dyn Object) -> bool {
        false
    }

    /// Moves the object within its collection's user-visible order.
    fn reorder(
        &self,
        _registry: &Registry,
        _obj: &dyn Object,
        _direction: ReorderDirection,
    ) -> bool {
        false
    }

    /// Permission check for the given access mask. `None` falls through;
    /// an unresolved chain means access is allowed.
    fn perm(&self, _obj: &dyn Object, _access: u32) -> Option<Result<(), TvCoreError>> {
        None
    }

    /// Enumerates child objects. `None` falls through.
    fn childs(&self, _registry: &Registry, _obj: &dyn Object) -> Option<ObjectSet> {
        None
    }
}

/// The all-defaults hook set for classes with nothing to override.
pub struct NoHooks;

impl ClassHooks for NoHooks {}

/// Shared instance for `hooks: &NO_HOOKS`.
pub static NO_HOOKS: NoHooks = NoHooks;

/// Static metadata describing one entity type.
pub struct ObjectClass {
    /// Process-unique class name.
    pub name: &'static str,
    pub parent: Option<&'static ObjectClass>,
    /// Human-readable caption for generated forms.
    pub caption: &'static str,
    /// Event name used for notification routing; resolved along the chain.
    pub event: Option<&'static str>,
    pub flags: ClassFlags,
    /// Ordered property list declared by this class alone.
    pub properties: &'static [Property],
    /// Property groups referenced by `Property::group`.
    pub groups: &'static [PropertyGroup],
    pub hooks: &'static (dyn ClassHooks + Sync),
}

impl ObjectClass {
    /// Iterates the ancestry from the concrete class to the root.
    pub fn chain(&'static self) -> impl Iterator<Item = &'static ObjectClass> {
        std::iter::successors(Some(self), |c| c.parent)
    }

    /// The topmost ancestor. Root classes partition entities for scoped
    /// indexing, so every class chain must terminate.
    pub fn root(&'static self) -> &'static ObjectClass {
        self.chain().last().unwrap()
    }

    /// Whether `self` is `ancestor` or inherits from it.
    pub fn is_instance(&'static self, ancestor: &ObjectClass) -> bool {
        self.chain().any(|c| std::ptr::eq(c, ancestor))
    }

    /// Chain-aware property resolution: the nearest class declaring the id
    /// wins, so a subclass property shadows a parent's of the same id while
    /// parent-only properties remain reachable.
    pub fn find_property(&'static self, id: &str) -> Option<&'static Property> {
        self.chain().find_map(|c| Property::find(c.properties, id))
    }

    /// First event name on the chain, falling back to the root class name.
    pub fn event_name(&'static self) -> &'static str {
        self.chain()
            .find_map(|c| c.event)
            .unwrap_or_else(|| self.root().name)
    }

    /// Whether any class on the chain carries the flag.
    pub fn chain_flags(&'static self, flags: ClassFlags) -> bool {
        self.chain().any(|c| c.flags.intersects(flags))
    }

    pub(crate) fn resolve_title(&'static self, obj: &dyn Object) -> Option<String> {
        self.chain().find_map(|c| c.hooks.title(obj))
    }

    pub(crate) fn invoke_save(&'static self, registry: &Registry, obj: &dyn Object) -> bool {
        self.chain().any(|c| c.hooks.save(registry, obj))
    }

    pub(crate) fn invoke_delete(&'static self, registry: &Registry, obj: &dyn Object) -> bool {
        self.chain().any(|c| c.hooks.delete(registry, obj))
    }

    pub(crate) fn invoke_changed(&'static self, registry: &Registry, obj: &dyn Object) -> bool {
        self.chain().any(|c| c.hooks.changed(registry, obj))
    }

    pub(crate) fn invoke_reorder(
        &'static self,
        registry: &Registry,
        obj: &dyn Object,
        direction: ReorderDirection,
    ) -> bool {
        self.chain()
            .any(|c| c.hooks.reorder(registry, obj, direction))
    }

    pub(crate) fn resolve_perm(
        &'static self,
        obj: &dyn Object,
        access: u32,
    ) -> Result<(), TvCoreError> {
        self.chain()
            .find_map(|c| c.hooks.perm(obj, access))
            .unwrap_or(Ok(()))
    }

    pub(crate) fn resolve_childs(
        &'static self,
        registry: &Registry,
        obj: &dyn Object,
    ) -> Option<ObjectSet> {
        self.chain().find_map(|c| c.hooks.childs(registry, obj))
    }
}

impl std::fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectClass")
            .field("name", &self.name)
            .field("parent", &self.parent.map(|p| p.name))
            .finish_non_exhaustive()
    }
}
