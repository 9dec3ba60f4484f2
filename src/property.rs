/*!

Property descriptors: the static metadata that makes one typed field of a
class reflectable. A `Property` names the field, declares its scalar type and
behavior flags, and carries the accessor functions that read and write it on
the type-erased object.

The engine never touches a domain struct's memory directly. Where the field is
a plain struct member the domain supplies a trivial `get`/`set` pair
(downcast, read or assign); computed, validated or externally-sourced values
supply richer accessors. `set == None` marks the property as computed-only at
the engine level.

*/

use bitflags::bitflags;
use serde::Serialize;
use serde_json::Value;

use crate::error::TvCoreError;
use crate::object::Object;
use crate::registry::Registry;

/// Scalar type tag of a property. The typed access layer refuses to coerce
/// between tags; a mismatch is reported to the caller instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Bool,
    /// Signed 32-bit integer.
    Int,
    U16,
    U32,
    S64,
    /// Double-precision float.
    Dbl,
    Str,
    /// Seconds since the epoch.
    Time,
    /// An octal file-permission value, e.g. `0o644`.
    Perm,
    /// A list of strings.
    StrList,
}

impl PropertyType {
    /// Whether the type stores an integer the numeric filter path can read.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PropertyType::Int
                | PropertyType::U16
                | PropertyType::U32
                | PropertyType::S64
                | PropertyType::Time
                | PropertyType::Perm
        )
    }
}

bitflags! {
    /// Behavior bits of a property.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct PropertyFlags: u32 {
        /// Not writable through the update path.
        const RDONLY    = 1 << 0;
        /// Never persisted by the save path.
        const NOSAVE    = 1 << 1;
        /// Hidden from generated forms.
        const HIDDEN    = 1 << 2;
        /// Only shown at the "advanced" visibility level.
        const ADVANCED  = 1 << 3;
        /// Only shown at the "expert" visibility level.
        const EXPERT    = 1 << 4;
        /// Rendered as a multi-line text box.
        const MULTILINE = 1 << 5;
        /// Writable only while the current value is unset.
        const WRONCE    = 1 << 6;
        /// Serialize the raw stored value even when a renderer exists.
        const USERAW    = 1 << 7;
        /// Sort by the raw stored value instead of the display label.
        const SORT_RAW  = 1 << 8;
        /// Omitted from client descriptions entirely.
        const NOUI      = 1 << 9;
    }
}

/// A named property group for generated configuration forms.
#[derive(Copy, Clone, Debug, Serialize)]
pub struct PropertyGroup {
    pub number: u32,
    pub caption: &'static str,
}

/// One enumerated value with its display label, as produced by a property's
/// `list` provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListEntry {
    pub value: Value,
    pub label: String,
}

impl ListEntry {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        ListEntry {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Reads the property off the object. `None` means the value is currently
/// unavailable (e.g. a computed source with nothing to report).
pub type GetFn = fn(&dyn Object) -> Option<Value>;
/// Writes the property. Returns whether the stored value actually changed.
pub type SetFn = fn(&mut dyn Object, &Value) -> Result<bool, TvCoreError>;
/// Enumerates the permitted values with display labels.
pub type ListFn = fn(&dyn Object) -> Vec<ListEntry>;
/// Renders the display form of the current value.
pub type RendFn = fn(&dyn Object) -> String;
/// Per-property change callback, fired after a setter reports a change.
pub type NotifyFn = fn(&dyn Object, &Registry);

/// Static metadata describing one typed field of a class.
pub struct Property {
    /// Key in configuration maps and filter/sort expressions.
    pub id: &'static str,
    /// Human-readable caption.
    pub name: &'static str,
    pub ptype: PropertyType,
    pub flags: PropertyFlags,
    pub get: GetFn,
    pub set: Option<SetFn>,
    pub list: Option<ListFn>,
    pub rend: Option<RendFn>,
    pub notify: Option<NotifyFn>,
    /// Internal integer scale factor for combined values (e.g. a channel
    /// number storing major*scale+minor). Numeric filters re-scale against it.
    pub intextra: Option<u32>,
    /// Property group number for generated forms; 0 means ungrouped.
    pub group: u32,
    /// Longer help text for generated forms.
    pub desc: Option<&'static str>,
}

impl Property {
    /// Linear scan of a single class's property list. Chain-aware resolution
    /// lives on `ObjectClass::find_property`.
    pub fn find(props: &'static [Property], id: &str) -> Option<&'static Property> {
        props.iter().find(|p| p.id == id)
    }

    /// The display form of the current value: the renderer if one exists,
    /// else the matching list label, else the raw value stringified.
    pub fn render(&self, obj: &dyn Object) -> String {
        if let Some(rend) = self.rend {
            return rend(obj);
        }
        let raw = (self.get)(obj);
        if let (Some(list), Some(raw)) = (self.list, raw.as_ref()) {
            if let Some(entry) = list(obj).into_iter().find(|e| e.value == *raw) {
                return entry.label;
            }
        }
        match raw {
            Some(Value::String(s)) => s,
            Some(v) => v.to_string(),
            None => String::new(),
        }
    }

    /// Whether sorting should compare display labels rather than raw values:
    /// a value-to-label provider exists and raw ordering was not requested.
    pub fn sorts_by_label(&self) -> bool {
        self.list.is_some() && !self.flags.contains(PropertyFlags::SORT_RAW)
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("ptype", &self.ptype)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
