/*!

The [`Object`] trait is what a domain struct implements to become a managed
entity: it exposes the identifier slot, the class descriptor, and type-erased
access to its state. Objects are heap-allocated and owned by the domain caller
through an [`ObjectRef`]; the engine holds clones of the `Rc` in its indices
and never owns the object's memory in any other sense.

Inherited properties need to reach the state a parent class declared even
though the concrete struct is opaque to the engine. Rather than punning on
struct layout, each object answers *aspect* queries: a `TypeId`-keyed lookup
returning the embedded per-class state slice. `impl_object!` writes the
lookup, and accessor functions use [`aspect_ref`]/[`aspect_mut`] to land on
the state struct they were written against, whatever the concrete type.

*/

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::class::ObjectClass;
use crate::error::TvCoreError;
use crate::property::{Property, PropertyType};
use crate::uuid::Uuid;

/// Implemented by every domain struct managed by the engine, normally via
/// the [`impl_object!`](crate::impl_object) macro.
pub trait Object: Any {
    /// The identifier. Zeroed until registration assigns one.
    fn uuid(&self) -> Uuid;
    /// Called exactly once, by registration.
    fn set_uuid(&mut self, uuid: Uuid);
    fn object_class(&self) -> &'static ObjectClass;

    /// Standard pattern for downcasting to concrete types.
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Type-erased access to the state slice identified by `id`: the
    /// concrete type itself, or an embedded ancestor-class state struct.
    fn aspect(&self, id: TypeId) -> Option<&dyn Any>;
    fn aspect_mut(&mut self, id: TypeId) -> Option<&mut dyn Any>;
}

/// A shared, interior-mutable handle to a managed object.
pub type ObjectRef = Rc<RefCell<dyn Object>>;

/// Resolves the state slice an accessor function was written against.
pub fn aspect_ref<T: Any>(obj: &dyn Object) -> Option<&T> {
    obj.aspect(TypeId::of::<T>())?.downcast_ref::<T>()
}

pub fn aspect_mut<T: Any>(obj: &mut dyn Object) -> Option<&mut T> {
    obj.aspect_mut(TypeId::of::<T>())?.downcast_mut::<T>()
}

/// Implements [`Object`] for a domain struct.
///
/// ```ignore
/// impl_object!(Channel {
///     uuid: id,
///     class: &CHANNEL_CLASS,
///     aspects: [OutputState => base],
/// });
/// ```
///
/// `aspects` lists the embedded ancestor state structs, outermost field path
/// per entry; the concrete type itself is always an aspect.
#[macro_export]
macro_rules! impl_object {
    ($ty:ty { uuid: $uuid:ident, class: $class:expr $(,)? }) => {
        $crate::impl_object!($ty { uuid: $uuid, class: $class, aspects: [] });
    };
    ($ty:ty { uuid: $uuid:ident, class: $class:expr,
              aspects: [ $( $aty:ty => $($field:ident).+ ),* $(,)? ] $(,)? }) => {
        impl $crate::object::Object for $ty {
            fn uuid(&self) -> $crate::uuid::Uuid {
                self.$uuid
            }

            fn set_uuid(&mut self, uuid: $crate::uuid::Uuid) {
                self.$uuid = uuid;
            }

            fn object_class(&self) -> &'static $crate::class::ObjectClass {
                $class
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }

            fn aspect(&self, id: std::any::TypeId) -> Option<&dyn std::any::Any> {
                if id == std::any::TypeId::of::<$ty>() {
                    return Some(self);
                }
                $(
                    if id == std::any::TypeId::of::<$aty>() {
                        return Some(&self.$($field).+);
                    }
                )*
                None
            }

            fn aspect_mut(&mut self, id: std::any::TypeId) -> Option<&mut dyn std::any::Any> {
                if id == std::any::TypeId::of::<$ty>() {
                    return Some(self);
                }
                $(
                    if id == std::any::TypeId::of::<$aty>() {
                        return Some(&mut self.$($field).+);
                    }
                )*
                None
            }
        }
    };
}

fn typed_value(obj: &dyn Object, id: &str, accept: &[PropertyType]) -> Result<Value, TvCoreError> {
    let prop = obj
        .object_class()
        .find_property(id)
        .ok_or_else(|| TvCoreError::UnknownProperty(id.to_string()))?;
    if !accept.contains(&prop.ptype) {
        return Err(TvCoreError::TypeMismatch(id.to_string()));
    }
    (prop.get)(obj).ok_or_else(|| TvCoreError::TvCoreError(format!("property '{id}' has no value")))
}

fn integer_of(value: &Value, id: &str) -> Result<i64, TvCoreError> {
    value
        .as_i64()
        .ok_or_else(|| TvCoreError::TypeMismatch(id.to_string()))
}

/// Generic typed getters, usable against any property regardless of the
/// declaring class (resolution walks the chain). A mismatch between the
/// requested accessor and the property's declared type is a failure, never a
/// coercion.
impl dyn Object {
    pub fn find_property(&self, id: &str) -> Option<&'static Property> {
        self.object_class().find_property(id)
    }

    /// Untyped reflective read.
    pub fn get_value(&self, id: &str) -> Option<Value> {
        let prop = self.find_property(id)?;
        (prop.get)(self)
    }

    pub fn get_bool(&self, id: &str) -> Result<bool, TvCoreError> {
        let v = typed_value(self, id, &[PropertyType::Bool])?;
        v.as_bool()
            .ok_or_else(|| TvCoreError::TypeMismatch(id.to_string()))
    }

    /// Accepts the 32-bit-and-narrower integer types.
    pub fn get_u32(&self, id: &str) -> Result<u32, TvCoreError> {
        let v = typed_value(
            self,
            id,
            &[PropertyType::Int, PropertyType::U16, PropertyType::U32, PropertyType::Perm],
        )?;
        let n = integer_of(&v, id)?;
        u32::try_from(n).map_err(|_| TvCoreError::TypeMismatch(id.to_string()))
    }

    /// Accepts every integer-bearing type, including times.
    pub fn get_s64(&self, id: &str) -> Result<i64, TvCoreError> {
        let v = typed_value(
            self,
            id,
            &[
                PropertyType::Int,
                PropertyType::U16,
                PropertyType::U32,
                PropertyType::S64,
                PropertyType::Time,
                PropertyType::Perm,
            ],
        )?;
        integer_of(&v, id)
    }

    pub fn get_dbl(&self, id: &str) -> Result<f64, TvCoreError> {
        let v = typed_value(self, id, &[PropertyType::Dbl])?;
        v.as_f64()
            .ok_or_else(|| TvCoreError::TypeMismatch(id.to_string()))
    }

    pub fn get_time(&self, id: &str) -> Result<i64, TvCoreError> {
        let v = typed_value(self, id, &[PropertyType::Time])?;
        integer_of(&v, id)
    }

    pub fn get_str(&self, id: &str) -> Result<String, TvCoreError> {
        let v = typed_value(self, id, &[PropertyType::Str])?;
        match v {
            Value::String(s) => Ok(s),
            _ => Err(TvCoreError::TypeMismatch(id.to_string())),
        }
    }

    pub fn get_strlist(&self, id: &str) -> Result<Vec<String>, TvCoreError> {
        let v = typed_value(self, id, &[PropertyType::StrList])?;
        let arr = v
            .as_array()
            .ok_or_else(|| TvCoreError::TypeMismatch(id.to_string()))?;
        arr.iter()
            .map(|e| {
                e.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| TvCoreError::TypeMismatch(id.to_string()))
            })
            .collect()
    }

    /// Display form of the property (renderer, list label, or raw).
    pub fn render(&self, id: &str) -> Option<String> {
        self.find_property(id).map(|p| p.render(self))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::TvCoreError;
    use crate::object::Object;
    use crate::testing::*;

    #[test]
    fn typed_getters_resolve_declared_types() {
        let ch = new_channel("BBC One", 1001);
        let obj: &dyn Object = &ch;
        assert_eq!(obj.get_u32("number").unwrap(), 1001);
        assert_eq!(obj.get_str("name").unwrap(), "BBC One");
        assert!(obj.get_bool("enabled").unwrap());
    }

    #[test]
    fn inherited_property_resolves_through_subclass() {
        // "name" is declared on the parent class only.
        let ch = new_channel("ITV", 3001);
        let obj: &dyn Object = &ch;
        assert_eq!(obj.get_str("name").unwrap(), "ITV");
    }

    #[test]
    fn type_mismatch_is_an_error_not_a_coercion() {
        let ch = new_channel("Dave", 19);
        let obj: &dyn Object = &ch;
        assert!(matches!(
            obj.get_str("number"),
            Err(TvCoreError::TypeMismatch(_))
        ));
        assert!(matches!(
            obj.get_u32("name"),
            Err(TvCoreError::TypeMismatch(_))
        ));
    }

    #[test]
    fn unknown_property_is_reported() {
        let ch = new_channel("Dave", 19);
        let obj: &dyn Object = &ch;
        assert!(matches!(
            obj.get_u32("frobnicate"),
            Err(TvCoreError::UnknownProperty(_))
        ));
    }

    #[test]
    fn strlist_round_trip() {
        let mut ch = new_channel("Dave", 19);
        ch.aliases = vec!["Dave ja vu".to_string(), "UKTV".to_string()];
        let obj: &dyn Object = &ch;
        assert_eq!(
            obj.get_strlist("aliases").unwrap(),
            vec!["Dave ja vu", "UKTV"]
        );
    }

    #[test]
    fn enumerated_property_renders_label() {
        let mut ch = new_channel("Dave", 19);
        ch.quality = 1;
        let obj: &dyn Object = &ch;
        assert_eq!(obj.render("quality").unwrap(), "HD");
        // Raw read still works.
        assert_eq!(obj.get_u32("quality").unwrap(), 1);
    }
}
