//! A small test-only domain model: an "output" root class with a "channel"
//! subclass, a separate "tag" root, and a reload-only "grabber channel"
//! class. Exercised by the unit tests across the crate.

use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::class::{ClassFlags, ClassHooks, ObjectClass, ReorderDirection};
use crate::error::TvCoreError;
use crate::impl_object;
use crate::object::{aspect_mut, aspect_ref, Object, ObjectRef};
use crate::property::{ListEntry, Property, PropertyFlags, PropertyGroup, PropertyType};
use crate::registry::Registry;
use crate::uuid::Uuid;

#[derive(Default)]
pub struct OutputState {
    pub name: String,
    pub enabled: bool,
}

pub struct Channel {
    pub id: Uuid,
    pub base: OutputState,
    pub number: u32,
    pub quality: u32,
    pub aliases: Vec<String>,
    pub icon: String,
    pub refs: u32,
    pub saved: Cell<u32>,
    pub changed_hook: Cell<u32>,
    pub number_notified: Cell<u32>,
    pub reordered: Cell<u32>,
}

pub struct Tag {
    pub id: Uuid,
    pub base: OutputState,
    pub index: u32,
    pub saved: Cell<u32>,
}

pub struct GrabberChannel {
    pub id: Uuid,
    pub base: OutputState,
    pub saved: Cell<u32>,
}

fn mismatch(id: &str) -> TvCoreError {
    TvCoreError::TypeMismatch(id.to_string())
}

// ---------------------------------------------------------------- output

fn name_get(o: &dyn Object) -> Option<Value> {
    aspect_ref::<OutputState>(o).map(|s| Value::from(s.name.clone()))
}

fn name_set(o: &mut dyn Object, v: &Value) -> Result<bool, TvCoreError> {
    let s = v.as_str().ok_or_else(|| mismatch("name"))?;
    let st = aspect_mut::<OutputState>(o).expect("output state");
    if st.name == s {
        return Ok(false);
    }
    st.name = s.to_string();
    Ok(true)
}

fn enabled_get(o: &dyn Object) -> Option<Value> {
    aspect_ref::<OutputState>(o).map(|s| Value::from(s.enabled))
}

fn enabled_set(o: &mut dyn Object, v: &Value) -> Result<bool, TvCoreError> {
    let b = v.as_bool().ok_or_else(|| mismatch("enabled"))?;
    let st = aspect_mut::<OutputState>(o).expect("output state");
    if st.enabled == b {
        return Ok(false);
    }
    st.enabled = b;
    Ok(true)
}

static OUTPUT_PROPS: [Property; 2] = [
    Property {
        id: "name",
        name: "Name",
        ptype: PropertyType::Str,
        flags: PropertyFlags::empty(),
        get: name_get,
        set: Some(name_set),
        list: None,
        rend: None,
        notify: None,
        intextra: None,
        group: 1,
        desc: None,
    },
    Property {
        id: "enabled",
        name: "Enabled",
        ptype: PropertyType::Bool,
        flags: PropertyFlags::empty(),
        get: enabled_get,
        set: Some(enabled_set),
        list: None,
        rend: None,
        notify: None,
        intextra: None,
        group: 1,
        desc: None,
    },
];

pub struct OutputHooks;

impl ClassHooks for OutputHooks {
    fn title(&self, obj: &dyn Object) -> Option<String> {
        aspect_ref::<OutputState>(obj).map(|s| s.name.clone())
    }
}

static OUTPUT_HOOKS: OutputHooks = OutputHooks;

pub static OUTPUT_GROUPS: [PropertyGroup; 1] = [PropertyGroup {
    number: 1,
    caption: "General",
}];

pub static OUTPUT_CLASS: ObjectClass = ObjectClass {
    name: "output",
    parent: None,
    caption: "Output",
    event: Some("output"),
    flags: ClassFlags::empty(),
    properties: &OUTPUT_PROPS,
    groups: &OUTPUT_GROUPS,
    hooks: &OUTPUT_HOOKS,
};

// --------------------------------------------------------------- channel

fn number_get(o: &dyn Object) -> Option<Value> {
    aspect_ref::<Channel>(o).map(|c| Value::from(u64::from(c.number)))
}

fn number_set(o: &mut dyn Object, v: &Value) -> Result<bool, TvCoreError> {
    let n = v
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| mismatch("number"))?;
    let ch = aspect_mut::<Channel>(o).expect("channel state");
    if ch.number == n {
        return Ok(false);
    }
    ch.number = n;
    Ok(true)
}

fn number_notify(o: &dyn Object, _registry: &Registry) {
    let ch = aspect_ref::<Channel>(o).expect("channel state");
    ch.number_notified.set(ch.number_notified.get() + 1);
}

fn channel_enabled_get(o: &dyn Object) -> Option<Value> {
    aspect_ref::<OutputState>(o).map(|s| Value::from(s.enabled))
}

fn quality_get(o: &dyn Object) -> Option<Value> {
    aspect_ref::<Channel>(o).map(|c| Value::from(u64::from(c.quality)))
}

fn quality_set(o: &mut dyn Object, v: &Value) -> Result<bool, TvCoreError> {
    let n = v
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| mismatch("quality"))?;
    let ch = aspect_mut::<Channel>(o).expect("channel state");
    if ch.quality == n {
        return Ok(false);
    }
    ch.quality = n;
    Ok(true)
}

fn quality_list(_o: &dyn Object) -> Vec<ListEntry> {
    vec![
        ListEntry::new(0u64, "SD"),
        ListEntry::new(1u64, "HD"),
        ListEntry::new(2u64, "UHD"),
    ]
}

fn aliases_get(o: &dyn Object) -> Option<Value> {
    aspect_ref::<Channel>(o).map(|c| Value::from(c.aliases.clone()))
}

fn aliases_set(o: &mut dyn Object, v: &Value) -> Result<bool, TvCoreError> {
    let arr = v.as_array().ok_or_else(|| mismatch("aliases"))?;
    let list: Vec<String> = arr
        .iter()
        .map(|e| e.as_str().map(str::to_string).ok_or_else(|| mismatch("aliases")))
        .collect::<Result<_, _>>()?;
    let ch = aspect_mut::<Channel>(o).expect("channel state");
    if ch.aliases == list {
        return Ok(false);
    }
    ch.aliases = list;
    Ok(true)
}

fn icon_get(o: &dyn Object) -> Option<Value> {
    aspect_ref::<Channel>(o).map(|c| Value::from(c.icon.clone()))
}

fn icon_set(o: &mut dyn Object, v: &Value) -> Result<bool, TvCoreError> {
    let s = v.as_str().ok_or_else(|| mismatch("icon"))?;
    let ch = aspect_mut::<Channel>(o).expect("channel state");
    if ch.icon == s {
        return Ok(false);
    }
    ch.icon = s.to_string();
    Ok(true)
}

fn refs_get(o: &dyn Object) -> Option<Value> {
    aspect_ref::<Channel>(o).map(|c| Value::from(u64::from(c.refs)))
}

static CHANNEL_PROPS: [Property; 6] = [
    Property {
        id: "number",
        name: "Number",
        ptype: PropertyType::U32,
        flags: PropertyFlags::empty(),
        get: number_get,
        set: Some(number_set),
        list: None,
        rend: None,
        notify: Some(number_notify),
        intextra: Some(1000),
        group: 1,
        desc: Some("Channel number as major*1000+minor"),
    },
    Property {
        id: "enabled",
        name: "Enabled (channel)",
        ptype: PropertyType::Bool,
        flags: PropertyFlags::empty(),
        get: channel_enabled_get,
        set: Some(enabled_set),
        list: None,
        rend: None,
        notify: None,
        intextra: None,
        group: 1,
        desc: None,
    },
    Property {
        id: "quality",
        name: "Quality",
        ptype: PropertyType::U32,
        flags: PropertyFlags::empty(),
        get: quality_get,
        set: Some(quality_set),
        list: Some(quality_list),
        rend: None,
        notify: None,
        intextra: None,
        group: 1,
        desc: None,
    },
    Property {
        id: "aliases",
        name: "Aliases",
        ptype: PropertyType::StrList,
        flags: PropertyFlags::empty(),
        get: aliases_get,
        set: Some(aliases_set),
        list: None,
        rend: None,
        notify: None,
        intextra: None,
        group: 2,
        desc: None,
    },
    Property {
        id: "icon",
        name: "Icon URL",
        ptype: PropertyType::Str,
        flags: PropertyFlags::NOSAVE,
        get: icon_get,
        set: Some(icon_set),
        list: None,
        rend: None,
        notify: None,
        intextra: None,
        group: 2,
        desc: None,
    },
    Property {
        id: "refs",
        name: "Reference count",
        ptype: PropertyType::U32,
        flags: PropertyFlags::RDONLY.union(PropertyFlags::NOSAVE),
        get: refs_get,
        set: None,
        list: None,
        rend: None,
        notify: None,
        intextra: None,
        group: 2,
        desc: None,
    },
];

pub struct ChannelHooks;

impl ClassHooks for ChannelHooks {
    fn title(&self, obj: &dyn Object) -> Option<String> {
        aspect_ref::<OutputState>(obj).map(|s| format!("channel {}", s.name))
    }

    fn save(&self, _registry: &Registry, obj: &dyn Object) -> bool {
        let ch = aspect_ref::<Channel>(obj).expect("channel state");
        ch.saved.set(ch.saved.get() + 1);
        true
    }

    fn changed(&self, _registry: &Registry, obj: &dyn Object) -> bool {
        let ch = aspect_ref::<Channel>(obj).expect("channel state");
        ch.changed_hook.set(ch.changed_hook.get() + 1);
        true
    }

    fn delete(&self, registry: &Registry, obj: &dyn Object) -> bool {
        registry.unregister(obj.uuid());
        true
    }

    fn reorder(
        &self,
        _registry: &Registry,
        obj: &dyn Object,
        _direction: ReorderDirection,
    ) -> bool {
        let ch = aspect_ref::<Channel>(obj).expect("channel state");
        ch.reordered.set(ch.reordered.get() + 1);
        true
    }
}

static CHANNEL_HOOKS: ChannelHooks = ChannelHooks;

pub static CHANNEL_CLASS: ObjectClass = ObjectClass {
    name: "channel",
    parent: Some(&OUTPUT_CLASS),
    caption: "Channel",
    event: None,
    flags: ClassFlags::empty(),
    properties: &CHANNEL_PROPS,
    groups: &OUTPUT_GROUPS,
    hooks: &CHANNEL_HOOKS,
};

impl_object!(Channel {
    uuid: id,
    class: &CHANNEL_CLASS,
    aspects: [OutputState => base],
});

pub fn new_channel(name: &str, number: u32) -> Channel {
    Channel {
        id: Uuid::default(),
        base: OutputState {
            name: name.to_string(),
            enabled: true,
        },
        number,
        quality: 0,
        aliases: Vec::new(),
        icon: String::new(),
        refs: 1,
        saved: Cell::new(0),
        changed_hook: Cell::new(0),
        number_notified: Cell::new(0),
        reordered: Cell::new(0),
    }
}

pub fn channel_ref(name: &str, number: u32) -> Rc<RefCell<Channel>> {
    Rc::new(RefCell::new(new_channel(name, number)))
}

pub fn channel_obj(name: &str, number: u32) -> ObjectRef {
    channel_ref(name, number)
}

// ------------------------------------------------------------------- tag

fn tag_index_get(o: &dyn Object) -> Option<Value> {
    aspect_ref::<Tag>(o).map(|t| Value::from(u64::from(t.index)))
}

fn tag_index_set(o: &mut dyn Object, v: &Value) -> Result<bool, TvCoreError> {
    let n = v
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| mismatch("index"))?;
    let tag = aspect_mut::<Tag>(o).expect("tag state");
    if tag.index == n {
        return Ok(false);
    }
    tag.index = n;
    Ok(true)
}

static TAG_PROPS: [Property; 2] = [
    Property {
        id: "name",
        name: "Name",
        ptype: PropertyType::Str,
        flags: PropertyFlags::empty(),
        get: name_get,
        set: Some(name_set),
        list: None,
        rend: None,
        notify: None,
        intextra: None,
        group: 0,
        desc: None,
    },
    Property {
        id: "index",
        name: "Sort index",
        ptype: PropertyType::U32,
        flags: PropertyFlags::WRONCE,
        get: tag_index_get,
        set: Some(tag_index_set),
        list: None,
        rend: None,
        notify: None,
        intextra: None,
        group: 0,
        desc: None,
    },
];

pub struct TagHooks;

impl ClassHooks for TagHooks {
    fn title(&self, obj: &dyn Object) -> Option<String> {
        aspect_ref::<OutputState>(obj).map(|s| format!("tag {}", s.name))
    }

    fn save(&self, _registry: &Registry, obj: &dyn Object) -> bool {
        let tag = aspect_ref::<Tag>(obj).expect("tag state");
        tag.saved.set(tag.saved.get() + 1);
        true
    }
}

static TAG_HOOKS: TagHooks = TagHooks;

pub static TAG_CLASS: ObjectClass = ObjectClass {
    name: "channeltag",
    parent: None,
    caption: "Channel Tag",
    event: Some("channeltag"),
    flags: ClassFlags::empty(),
    properties: &TAG_PROPS,
    groups: &[],
    hooks: &TAG_HOOKS,
};

impl_object!(Tag {
    uuid: id,
    class: &TAG_CLASS,
    aspects: [OutputState => base],
});

pub fn new_tag(name: &str) -> Tag {
    Tag {
        id: Uuid::default(),
        base: OutputState {
            name: name.to_string(),
            enabled: true,
        },
        index: 0,
        saved: Cell::new(0),
    }
}

pub fn tag_ref(name: &str) -> Rc<RefCell<Tag>> {
    Rc::new(RefCell::new(new_tag(name)))
}

pub fn tag_obj(name: &str) -> ObjectRef {
    tag_ref(name)
}

// ------------------------------------------------------- grabber channel

static GRABBER_PROPS: [Property; 1] = [Property {
    id: "name",
    name: "Name",
    ptype: PropertyType::Str,
    flags: PropertyFlags::empty(),
    get: name_get,
    set: Some(name_set),
    list: None,
    rend: None,
    notify: None,
    intextra: None,
    group: 0,
    desc: None,
}];

pub struct GrabberHooks;

impl ClassHooks for GrabberHooks {
    fn save(&self, _registry: &Registry, obj: &dyn Object) -> bool {
        let gc = aspect_ref::<GrabberChannel>(obj).expect("grabber state");
        gc.saved.set(gc.saved.get() + 1);
        true
    }
}

static GRABBER_HOOKS: GrabberHooks = GrabberHooks;

pub static GRABBER_CLASS: ObjectClass = ObjectClass {
    name: "epggrab_channel",
    parent: None,
    caption: "EPG Grabber Channel",
    event: Some("epggrab_channel"),
    flags: ClassFlags::RELOAD,
    properties: &GRABBER_PROPS,
    groups: &[],
    hooks: &GRABBER_HOOKS,
};

impl_object!(GrabberChannel {
    uuid: id,
    class: &GRABBER_CLASS,
    aspects: [OutputState => base],
});

pub fn grabber_obj(name: &str) -> ObjectRef {
    Rc::new(RefCell::new(GrabberChannel {
        id: Uuid::default(),
        base: OutputState {
            name: name.to_string(),
            enabled: true,
        },
        saved: Cell::new(0),
    }))
}
