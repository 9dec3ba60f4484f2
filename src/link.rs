/*!

Symmetric many-to-many links between two arbitrary objects, independent of
the class hierarchy. A link is one record per ordered `(left, right)` pair
with per-direction persist-on-change flags; both participants see the link
(the left side through its forward list, the right side through its reverse
list), and removing it always severs both directions together.

The registry owns the whole link table as data — a record map plus two
insertion-ordered adjacency tables keyed by identifier — so links never hold
references into object memory and object teardown cannot leave a dangling
link behind.

Bulk reconciliation ("relate this object to exactly this list") is
mark-and-sweep: mark every existing link of the anchor, re-link each target
(clearing the mark, or creating a fresh record), then sweep what stayed
marked.

*/

use log::debug;

use crate::class::ObjectClass;
use crate::error::TvCoreError;
use crate::hash::{HashMap, HashSet};
use crate::registry::Registry;
use crate::uuid::Uuid;

/// Which side of a link an object sits on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct LinkRecord {
    pub left_save: bool,
    pub right_save: bool,
    /// Transient pending-deletion mark, used only during reconciliation.
    pub mark: bool,
}

#[derive(Default)]
pub(crate) struct LinkTable {
    records: HashMap<(Uuid, Uuid), LinkRecord>,
    /// left -> rights, in link-creation order.
    forward: HashMap<Uuid, Vec<Uuid>>,
    /// right -> lefts, in link-creation order.
    reverse: HashMap<Uuid, Vec<Uuid>>,
}

impl LinkTable {
    /// Inserts the pair, or clears the pending-deletion mark of an existing
    /// record. Returns whether a record was created.
    fn insert(&mut self, left: Uuid, right: Uuid, left_save: bool, right_save: bool) -> bool {
        if let Some(record) = self.records.get_mut(&(left, right)) {
            record.mark = false;
            return false;
        }
        self.records.insert(
            (left, right),
            LinkRecord {
                left_save,
                right_save,
                mark: false,
            },
        );
        self.forward.entry(left).or_default().push(right);
        self.reverse.entry(right).or_default().push(left);
        true
    }

    fn remove(&mut self, left: Uuid, right: Uuid) -> Option<LinkRecord> {
        let record = self.records.remove(&(left, right))?;
        if let Some(rights) = self.forward.get_mut(&left) {
            rights.retain(|r| *r != right);
            if rights.is_empty() {
                self.forward.remove(&left);
            }
        }
        if let Some(lefts) = self.reverse.get_mut(&right) {
            lefts.retain(|l| *l != left);
            if lefts.is_empty() {
                self.reverse.remove(&right);
            }
        }
        Some(record)
    }

    fn pairs_of(&self, side: Side, anchor: Uuid) -> Vec<(Uuid, Uuid)> {
        match side {
            Side::Left => self
                .forward
                .get(&anchor)
                .map(|rights| rights.iter().map(|r| (anchor, *r)).collect())
                .unwrap_or_default(),
            Side::Right => self
                .reverse
                .get(&anchor)
                .map(|lefts| lefts.iter().map(|l| (*l, anchor)).collect())
                .unwrap_or_default(),
        }
    }

    fn mark_all(&mut self, side: Side, anchor: Uuid) {
        for pair in self.pairs_of(side, anchor) {
            if let Some(record) = self.records.get_mut(&pair) {
                record.mark = true;
            }
        }
    }

    /// Removes every still-marked link of the anchor on the given side,
    /// returning the removed pairs with their records.
    fn sweep(&mut self, side: Side, anchor: Uuid) -> Vec<((Uuid, Uuid), LinkRecord)> {
        let marked: Vec<(Uuid, Uuid)> = self
            .pairs_of(side, anchor)
            .into_iter()
            .filter(|pair| self.records.get(pair).is_some_and(|r| r.mark))
            .collect();
        marked
            .into_iter()
            .filter_map(|pair| self.remove(pair.0, pair.1).map(|r| (pair, r)))
            .collect()
    }

    /// Severs every link touching the object, in both directions.
    pub(crate) fn remove_all_of(&mut self, uuid: Uuid) -> Vec<((Uuid, Uuid), LinkRecord)> {
        let mut pairs = self.pairs_of(Side::Left, uuid);
        pairs.extend(self.pairs_of(Side::Right, uuid));
        pairs
            .into_iter()
            .filter_map(|pair| self.remove(pair.0, pair.1).map(|r| (pair, r)))
            .collect()
    }

    fn partners(&self, side: Side, anchor: Uuid) -> Vec<Uuid> {
        match side {
            Side::Left => self.forward.get(&anchor).cloned().unwrap_or_default(),
            Side::Right => self.reverse.get(&anchor).cloned().unwrap_or_default(),
        }
    }
}

/// The persist-flagged, non-origin endpoints of a batch of link changes,
/// each at most once.
pub(crate) fn partners_to_notify(
    changes: &[((Uuid, Uuid), LinkRecord)],
    origin: Option<Uuid>,
) -> Vec<Uuid> {
    let mut seen: HashSet<Uuid> = HashSet::default();
    let mut out = Vec::new();
    for ((left, right), record) in changes {
        for (uuid, save) in [(*left, record.left_save), (*right, record.right_save)] {
            if save && Some(uuid) != origin && seen.insert(uuid) {
                out.push(uuid);
            }
        }
    }
    out
}

impl Registry {
    /// Creates a symmetric link between two registered objects. Linking an
    /// already-linked pair is a no-op that clears any pending-deletion mark.
    /// Returns whether a link was created.
    ///
    /// `left_save`/`right_save` select which endpoints get their changed
    /// path (save hook plus change notification) when the link is created or
    /// destroyed; `origin` names the endpoint driving the call, which is
    /// never notified.
    pub fn link(
        &self,
        left: Uuid,
        right: Uuid,
        left_save: bool,
        right_save: bool,
        origin: Option<Uuid>,
    ) -> Result<bool, TvCoreError> {
        for uuid in [left, right] {
            if self.find(uuid, None).is_none() {
                return Err(TvCoreError::NotRegistered(uuid.hex()));
            }
        }
        let created = self
            .links
            .borrow_mut()
            .insert(left, right, left_save, right_save);
        if created {
            let record = LinkRecord {
                left_save,
                right_save,
                mark: false,
            };
            for uuid in partners_to_notify(&[((left, right), record)], origin) {
                self.object_changed_by_uuid(uuid);
            }
        }
        Ok(created)
    }

    /// Removes both directions of the pair together. The non-origin side is
    /// notified iff its persist flag is set. Returns whether a link existed.
    pub fn unlink(&self, left: Uuid, right: Uuid, origin: Option<Uuid>) -> bool {
        let removed = self.links.borrow_mut().remove(left, right);
        match removed {
            Some(record) => {
                for uuid in partners_to_notify(&[((left, right), record)], origin) {
                    self.object_changed_by_uuid(uuid);
                }
                true
            }
            None => false,
        }
    }

    /// Bulk reconciliation: make the anchor's links on `side` exactly the
    /// target list. Unresolvable targets (bad identifier, not registered,
    /// failing the class check) are skipped. Returns whether any link was
    /// created or deleted; the anchor is the origin and is never notified
    /// here, every other persist-flagged endpoint touched by a net change is
    /// notified exactly once.
    pub fn set_links(
        &self,
        side: Side,
        anchor: Uuid,
        targets: &[&str],
        class: Option<&'static ObjectClass>,
        anchor_save: bool,
        target_save: bool,
    ) -> Result<bool, TvCoreError> {
        if self.find(anchor, None).is_none() {
            return Err(TvCoreError::NotRegistered(anchor.hex()));
        }

        self.links.borrow_mut().mark_all(side, anchor);

        let mut created: Vec<((Uuid, Uuid), LinkRecord)> = Vec::new();
        for target in targets {
            let Ok(uuid) = Uuid::from_hex(target) else {
                debug!("skipping unparsable link target '{target}'");
                continue;
            };
            if self.find(uuid, class).is_none() {
                debug!("skipping unresolvable link target '{target}'");
                continue;
            }
            let (left, right) = match side {
                Side::Left => (anchor, uuid),
                Side::Right => (uuid, anchor),
            };
            let (left_save, right_save) = match side {
                Side::Left => (anchor_save, target_save),
                Side::Right => (target_save, anchor_save),
            };
            if self
                .links
                .borrow_mut()
                .insert(left, right, left_save, right_save)
            {
                created.push((
                    (left, right),
                    LinkRecord {
                        left_save,
                        right_save,
                        mark: false,
                    },
                ));
            }
        }

        let deleted = self.links.borrow_mut().sweep(side, anchor);

        let mut changes = created;
        let changed = !changes.is_empty() || !deleted.is_empty();
        changes.extend(deleted);
        for uuid in partners_to_notify(&changes, Some(anchor)) {
            self.object_changed_by_uuid(uuid);
        }
        Ok(changed)
    }

    /// Identifiers linked from `left`'s forward relation, in creation order.
    pub fn linked_from(&self, left: Uuid) -> Vec<Uuid> {
        self.links.borrow().partners(Side::Left, left)
    }

    /// Identifiers linked to `right` through its reverse relation.
    pub fn linked_to(&self, right: Uuid) -> Vec<Uuid> {
        self.links.borrow().partners(Side::Right, right)
    }

    /// The partner list as a JSON array of hex identifiers, the form the
    /// serialization surface stores.
    pub fn link_uuids_msg(&self, side: Side, anchor: Uuid) -> serde_json::Value {
        serde_json::Value::from(
            self.links
                .borrow()
                .partners(side, anchor)
                .into_iter()
                .map(|u| u.hex())
                .collect::<Vec<_>>(),
        )
    }

    /// The partner list rendered as a comma-separated string of display
    /// titles, for human-facing columns.
    pub fn link_titles_csv(&self, side: Side, anchor: Uuid) -> String {
        let partners = self.links.borrow().partners(side, anchor);
        partners
            .into_iter()
            .filter_map(|u| self.find(u, None))
            .map(|obj| self.object_title(&obj))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
