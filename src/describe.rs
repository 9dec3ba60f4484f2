/*!

Structured descriptions of objects and classes for external presentation
layers. An [`ObjectDescription`] carries everything a client needs to render
one object's configuration form — identifier, computed title, class naming,
and the ordered parameter list with current values and UI metadata. A
[`ClassDescription`] describes the class alone, letting a client
auto-generate forms without per-class code.

Parameters walk the chain superclass-first, with a separator entry between
class sections, so generated forms group general settings before specific
ones.

*/

use serde::Serialize;
use serde_json::Value;

use crate::class::ObjectClass;
use crate::object::{Object, ObjectRef};
use crate::property::{ListEntry, Property, PropertyFlags, PropertyGroup, PropertyType};
use crate::registry::Registry;

/// One property as presented to clients.
#[derive(Debug, Serialize)]
pub struct PropertyDescription {
    pub id: &'static str,
    pub caption: &'static str,
    #[serde(rename = "type")]
    pub ptype: PropertyType,
    /// Current value; absent in class descriptions. Rendered display form
    /// for enumerated/rendered properties unless the raw flag asks
    /// otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub rdonly: bool,
    pub hidden: bool,
    pub advanced: bool,
    pub expert: bool,
    pub multiline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
    /// The permitted values with display labels, for enumerated properties.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<ListEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

/// One entry of an object's parameter list: a property, or a separator
/// between class sections.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ObjectParam {
    Separator {
        caption: &'static str,
        #[serde(rename = "type")]
        kind: &'static str,
    },
    Property(PropertyDescription),
}

#[derive(Debug, Serialize)]
pub struct ObjectDescription {
    pub id: String,
    /// Computed display title.
    pub text: String,
    pub class: &'static str,
    pub caption: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<&'static str>,
    pub params: Vec<ObjectParam>,
}

#[derive(Debug, Serialize)]
pub struct ClassDescription {
    pub name: &'static str,
    pub caption: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<&'static str>,
    pub groups: Vec<PropertyGroup>,
    pub props: Vec<PropertyDescription>,
}

fn describe_property(p: &'static Property, obj: Option<&dyn Object>) -> PropertyDescription {
    let value = obj.and_then(|obj| {
        let rendered = p.rend.is_some() || p.list.is_some();
        if rendered && !p.flags.contains(PropertyFlags::USERAW) {
            Some(Value::String(p.render(obj)))
        } else {
            (p.get)(obj)
        }
    });
    PropertyDescription {
        id: p.id,
        caption: p.name,
        ptype: p.ptype,
        value,
        rdonly: p.flags.contains(PropertyFlags::RDONLY),
        hidden: p.flags.contains(PropertyFlags::HIDDEN),
        advanced: p.flags.contains(PropertyFlags::ADVANCED),
        expert: p.flags.contains(PropertyFlags::EXPERT),
        multiline: p.flags.contains(PropertyFlags::MULTILINE),
        group: (p.group != 0).then_some(p.group),
        values: obj.and_then(|obj| p.list.map(|list| list(obj))),
        description: p.desc,
    }
}

/// The classes of the chain, root first.
fn chain_root_first(class: &'static ObjectClass) -> Vec<&'static ObjectClass> {
    let mut chain: Vec<_> = class.chain().collect();
    chain.reverse();
    chain
}

/// Walks the chain root-first, emitting each class's visible properties with
/// shadowed ids resolved nearest-class-wins, and a separator between
/// non-empty class sections.
fn collect_params(class: &'static ObjectClass, obj: Option<&dyn Object>) -> Vec<ObjectParam> {
    let mut params: Vec<ObjectParam> = Vec::new();
    for c in chain_root_first(class) {
        let section: Vec<PropertyDescription> = c
            .properties
            .iter()
            .filter(|p| !p.flags.contains(PropertyFlags::NOUI))
            // Shadow check: the chain-walk resolution for this id must land
            // on this very descriptor.
            .filter(|p| {
                class
                    .find_property(p.id)
                    .is_some_and(|winner| std::ptr::eq(winner, *p))
            })
            .map(|p| describe_property(p, obj))
            .collect();
        if section.is_empty() {
            continue;
        }
        if !params.is_empty() {
            params.push(ObjectParam::Separator {
                caption: c.caption,
                kind: "separator",
            });
        }
        params.extend(section.into_iter().map(ObjectParam::Property));
    }
    params
}

impl ObjectDescription {
    pub fn new(registry: &Registry, obj: &ObjectRef) -> Self {
        let text = registry.object_title(obj);
        let guard = obj.borrow();
        let class = guard.object_class();
        ObjectDescription {
            id: guard.uuid().hex(),
            text,
            class: class.name,
            caption: class.caption,
            event: class.chain().find_map(|c| c.event),
            params: collect_params(class, Some(&*guard)),
        }
    }

    /// The serialized form handed to protocol layers.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("description serialization")
    }
}

impl ClassDescription {
    pub fn new(class: &'static ObjectClass) -> Self {
        ClassDescription {
            name: class.name,
            caption: class.caption,
            event: class.chain().find_map(|c| c.event),
            groups: class.groups.to_vec(),
            props: chain_root_first(class)
                .into_iter()
                .flat_map(|c| c.properties.iter())
                .filter(|p| !p.flags.contains(PropertyFlags::NOUI))
                .filter(|p| {
                    class
                        .find_property(p.id)
                        .is_some_and(|winner| std::ptr::eq(winner, *p))
                })
                .map(|p| describe_property(p, None))
                .collect(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("description serialization")
    }
}

/// Convenience: describe every registered class, in name order.
pub fn describe_classes(registry: &Registry) -> Vec<ClassDescription> {
    registry.classes().into_iter().map(ClassDescription::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InsertFlags;
    use crate::testing::*;

    #[test]
    fn object_description_carries_identity_and_title() {
        let registry = Registry::new();
        let ch = channel_obj("BBC One", 1001);
        let uuid = registry
            .register(&ch, None, InsertFlags::empty(), None)
            .unwrap();

        let desc = ObjectDescription::new(&registry, &ch);
        assert_eq!(desc.id, uuid.hex());
        assert_eq!(desc.text, "channel BBC One");
        assert_eq!(desc.class, "channel");
        assert_eq!(desc.caption, "Channel");
        assert_eq!(desc.event, Some("output"));
    }

    #[test]
    fn params_walk_superclass_first_with_a_separator() {
        let registry = Registry::new();
        let ch = channel_obj("BBC One", 1001);
        registry
            .register(&ch, None, InsertFlags::empty(), None)
            .unwrap();

        let desc = ObjectDescription::new(&registry, &ch);
        let ids: Vec<&str> = desc
            .params
            .iter()
            .filter_map(|p| match p {
                ObjectParam::Property(p) => Some(p.id),
                ObjectParam::Separator { .. } => None,
            })
            .collect();
        // Parent's "name" first; the shadowed "enabled" appears once, in the
        // subclass section.
        assert_eq!(ids, vec!["name", "number", "enabled", "quality", "aliases", "icon", "refs"]);

        let separators: Vec<&str> = desc
            .params
            .iter()
            .filter_map(|p| match p {
                ObjectParam::Separator { caption, .. } => Some(*caption),
                ObjectParam::Property(_) => None,
            })
            .collect();
        assert_eq!(separators, vec!["Channel"]);
    }

    #[test]
    fn shadowed_property_shows_the_subclass_caption() {
        let registry = Registry::new();
        let ch = channel_obj("BBC One", 1001);
        registry
            .register(&ch, None, InsertFlags::empty(), None)
            .unwrap();
        let desc = ObjectDescription::new(&registry, &ch);
        let enabled = desc
            .params
            .iter()
            .find_map(|p| match p {
                ObjectParam::Property(p) if p.id == "enabled" => Some(p),
                _ => None,
            })
            .unwrap();
        assert_eq!(enabled.caption, "Enabled (channel)");
    }

    #[test]
    fn enumerated_value_is_rendered_and_lists_choices() {
        let registry = Registry::new();
        let ch = channel_ref("BBC One HD", 101);
        ch.borrow_mut().quality = 1;
        let obj: crate::object::ObjectRef = ch.clone();
        registry
            .register(&obj, None, InsertFlags::empty(), None)
            .unwrap();

        let desc = ObjectDescription::new(&registry, &obj);
        let quality = desc
            .params
            .iter()
            .find_map(|p| match p {
                ObjectParam::Property(p) if p.id == "quality" => Some(p),
                _ => None,
            })
            .unwrap();
        assert_eq!(quality.value, Some(Value::String("HD".to_string())));
        assert_eq!(quality.values.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn flags_break_out_as_booleans() {
        let registry = Registry::new();
        let ch = channel_obj("BBC One", 1001);
        registry
            .register(&ch, None, InsertFlags::empty(), None)
            .unwrap();
        let desc = ObjectDescription::new(&registry, &ch);
        let refs = desc
            .params
            .iter()
            .find_map(|p| match p {
                ObjectParam::Property(p) if p.id == "refs" => Some(p),
                _ => None,
            })
            .unwrap();
        assert!(refs.rdonly);
        assert!(!refs.hidden);
    }

    #[test]
    fn class_description_describes_without_values() {
        let desc = ClassDescription::new(&CHANNEL_CLASS);
        assert_eq!(desc.name, "channel");
        assert_eq!(desc.caption, "Channel");
        assert_eq!(desc.groups.len(), 1);
        assert!(desc.props.iter().all(|p| p.value.is_none()));
        let ids: Vec<&str> = desc.props.iter().map(|p| p.id).collect();
        assert_eq!(ids[0], "name");
        assert!(ids.contains(&"number"));
    }

    #[test]
    fn descriptions_serialize_to_json() {
        let registry = Registry::new();
        let ch = channel_obj("BBC One", 1001);
        registry
            .register(&ch, None, InsertFlags::empty(), None)
            .unwrap();
        let json = ObjectDescription::new(&registry, &ch).to_value();
        assert_eq!(json["class"], "channel");
        assert!(json["params"].is_array());
        // Separator entries serialize with their marker type.
        let has_separator = json["params"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["type"] == "separator");
        assert!(has_separator);

        let class_json = ClassDescription::new(&CHANNEL_CLASS).to_value();
        assert_eq!(class_json["name"], "channel");
    }
}
