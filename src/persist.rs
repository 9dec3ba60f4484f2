/*!

The persistence bridge: conversion between live objects and the generic
ordered key-value map an external settings layer produces and consumes. The
engine itself performs no disk I/O; it only walks the class chain applying or
querying property values and invokes the class save hook at the right
moments.

Three entry points with distinct side-effect contracts:

- [`load`](RegistryPersistExt::load) is the trusted-source construction path:
  it fires no notifications and no per-property notify callbacks. Domain
  types therefore need no "loading in progress" guard of their own.
- [`update`](RegistryPersistExt::update) is the untrusted write path: values
  go through setters with the option bits enforced, hooks run only when
  something actually changed, and a change notification fires whenever the
  caller requested one.
- [`save`](RegistryPersistExt::save) queries the map back, applying the
  "should this property be persisted" bits.

*/

use log::debug;
use serde_json::Value;

use crate::error::TvCoreError;
use crate::events::ObjectEvent;
use crate::hash::HashSet;
use crate::object::{Object, ObjectRef};
use crate::property::{Property, PropertyFlags};
use crate::registry::Registry;

/// The abstract ordered map produced and consumed by the settings layer.
/// Insertion-ordered, so configuration files keep their declared field
/// order.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Whether a current property value counts as "unset" for write-once
/// semantics: absent, null, zero, or empty.
fn value_is_unset(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(v) => v.as_i64() == Some(0),
    }
}

pub trait RegistryPersistExt {
    /// Populates the object's properties from the map, walking the class
    /// chain so inherited properties are populated too. This path represents
    /// initial construction from a trusted source and never fires change
    /// notifications or per-property callbacks.
    fn load(&self, obj: &ObjectRef, conf: &ConfigMap);

    /// Queries the object's persisted properties back into a map, skipping
    /// `NOSAVE` properties and properties with no current value. Shadowed
    /// ids serialize once, nearest class winning. Optionally invokes the
    /// class save hook afterwards.
    fn save(&self, obj: &ObjectRef, invoke_hook: bool) -> ConfigMap;

    /// Applies new values through setters (`RDONLY` refused, `WRONCE` only
    /// while unset), fires per-property notify callbacks for actual changes,
    /// runs the changed and save hooks only if a change occurred, and queues
    /// a change notification whenever `notify` is requested. Returns whether
    /// anything changed.
    fn update(&self, obj: &ObjectRef, conf: &ConfigMap, notify: bool) -> bool;

    /// Single-key write with the same side effects as `update` on change.
    fn set_prop(&self, obj: &ObjectRef, key: &str, value: &Value) -> Result<bool, TvCoreError>;
}

/// Applies `conf` through the chain with shadowing respected; returns the
/// properties whose setters reported a change.
fn apply_values(
    obj: &mut dyn Object,
    conf: &ConfigMap,
    trusted: bool,
) -> Vec<&'static Property> {
    let class = obj.object_class();
    let mut seen: HashSet<&'static str> = HashSet::default();
    let mut changed: Vec<&'static Property> = Vec::new();

    for c in class.chain() {
        for p in c.properties {
            if !seen.insert(p.id) {
                continue;
            }
            let Some(set) = p.set else {
                continue;
            };
            let Some(value) = conf.get(p.id) else {
                continue;
            };
            if !trusted {
                if p.flags.contains(PropertyFlags::RDONLY) {
                    continue;
                }
                if p.flags.contains(PropertyFlags::WRONCE) && !value_is_unset(&(p.get)(obj)) {
                    continue;
                }
            }
            match set(obj, value) {
                Ok(true) => changed.push(p),
                Ok(false) => {}
                Err(e) => debug!("skipping bad value for property '{}': {e}", p.id),
            }
        }
    }
    changed
}

impl RegistryPersistExt for Registry {
    fn load(&self, obj: &ObjectRef, conf: &ConfigMap) {
        let mut guard = obj.borrow_mut();
        apply_values(&mut *guard, conf, true);
    }

    fn save(&self, obj: &ObjectRef, invoke_hook: bool) -> ConfigMap {
        let mut conf = ConfigMap::new();
        {
            let guard = obj.borrow();
            let class = guard.object_class();
            let mut seen: HashSet<&'static str> = HashSet::default();
            for c in class.chain() {
                for p in c.properties {
                    if !seen.insert(p.id) {
                        continue;
                    }
                    if p.flags.contains(PropertyFlags::NOSAVE) {
                        continue;
                    }
                    if let Some(value) = (p.get)(&*guard) {
                        conf.insert(p.id.to_string(), value);
                    }
                }
            }
        }
        if invoke_hook {
            self.object_save(obj);
        }
        conf
    }

    fn update(&self, obj: &ObjectRef, conf: &ConfigMap, notify: bool) -> bool {
        let changed_props = {
            let mut guard = obj.borrow_mut();
            apply_values(&mut *guard, conf, false)
        };

        let uuid = obj.borrow().uuid();
        let class = obj.borrow().object_class();
        let changed = !changed_props.is_empty();

        if changed {
            {
                let guard = obj.borrow();
                for p in &changed_props {
                    if let Some(notify_fn) = p.notify {
                        notify_fn(&*guard, self);
                    }
                }
                class.invoke_changed(self, &*guard);
                class.invoke_save(self, &*guard);
            }
        }
        if notify {
            self.queue_event(class, ObjectEvent::Changed { uuid });
        }
        changed
    }

    fn set_prop(&self, obj: &ObjectRef, key: &str, value: &Value) -> Result<bool, TvCoreError> {
        let prop = {
            let guard = obj.borrow();
            guard
                .object_class()
                .find_property(key)
                .ok_or_else(|| TvCoreError::UnknownProperty(key.to_string()))?
        };
        if prop.flags.contains(PropertyFlags::RDONLY) || prop.set.is_none() {
            return Err(TvCoreError::TvCoreError(format!(
                "property '{key}' is read-only"
            )));
        }
        let changed = {
            let mut guard = obj.borrow_mut();
            if prop.flags.contains(PropertyFlags::WRONCE)
                && !value_is_unset(&(prop.get)(&*guard))
            {
                return Err(TvCoreError::TvCoreError(format!(
                    "property '{key}' is write-once"
                )));
            }
            let set = prop.set.unwrap();
            set(&mut *guard, value)?
        };
        if changed {
            if let Some(notify_fn) = prop.notify {
                notify_fn(&*obj.borrow(), self);
            }
            self.object_changed(obj);
        }
        Ok(changed)
    }
}
