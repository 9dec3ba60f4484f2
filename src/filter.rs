/*!

Ad-hoc query support driven purely by property descriptors: a [`Filter`] is a
set of independent predicates, implicitly ANDed, and a [`SortKey`] names a
property plus a direction. Neither needs per-class query code; both resolve
properties through the class chain at evaluation time.

A predicate that cannot be evaluated against a given object — the property is
missing, or its declared type does not fit the predicate — fails that object.

*/

use std::cell::Cell;
use std::cmp::Ordering;

use log::warn;
use regex::{Regex, RegexBuilder};
use crate::object::Object;
use crate::property::PropertyType;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Lt,
    Gt,
    /// Substring containment (string predicates only).
    In,
    /// Case-insensitive regular expression (string predicates only).
    Re,
}

enum PredicateValue {
    Str(String),
    Re(Regex),
    Num {
        value: Cell<i64>,
        /// The scale factor the filter value was expressed in, if any.
        intsplit: Option<u32>,
        /// Set once the value has been re-scaled into a property's native
        /// unit; the adjustment happens at most once per predicate.
        adjusted: Cell<bool>,
    },
    Dbl(f64),
    Bool(bool),
}

struct Predicate {
    key: String,
    comp: Comparator,
    value: PredicateValue,
}

/// A conjunction of predicates over property values.
#[derive(Default)]
pub struct Filter {
    elements: Vec<Predicate>,
}

fn ordering_passes(comp: Comparator, ord: Ordering) -> bool {
    match comp {
        Comparator::Eq => ord == Ordering::Equal,
        Comparator::Lt => ord == Ordering::Less,
        Comparator::Gt => ord == Ordering::Greater,
        // Not meaningful for ordered scalars; evaluates as pass.
        Comparator::In | Comparator::Re => true,
    }
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Adds a string predicate. With `Comparator::Re` the value is compiled
    /// as a case-insensitive regular expression; a pattern that fails to
    /// compile drops the predicate (logged, not surfaced).
    pub fn add_str(&mut self, key: &str, value: &str, comp: Comparator) {
        let value = if comp == Comparator::Re {
            match RegexBuilder::new(value).case_insensitive(true).build() {
                Ok(re) => PredicateValue::Re(re),
                Err(e) => {
                    warn!("dropping unparsable filter regex for '{key}': {e}");
                    return;
                }
            }
        } else {
            PredicateValue::Str(value.to_string())
        };
        self.elements.push(Predicate {
            key: key.to_string(),
            comp,
            value,
        });
    }

    /// Adds a numeric predicate. `intsplit` declares the scale factor the
    /// value is expressed in (e.g. combined major/minor numbering); when a
    /// target property declares a different native scale, the value is
    /// re-scaled once, lazily, on first evaluation against such a property.
    pub fn add_num(&mut self, key: &str, value: i64, intsplit: Option<u32>, comp: Comparator) {
        self.elements.push(Predicate {
            key: key.to_string(),
            comp,
            value: PredicateValue::Num {
                value: Cell::new(value),
                intsplit,
                adjusted: Cell::new(false),
            },
        });
    }

    pub fn add_dbl(&mut self, key: &str, value: f64, comp: Comparator) {
        self.elements.push(Predicate {
            key: key.to_string(),
            comp,
            value: PredicateValue::Dbl(value),
        });
    }

    pub fn add_bool(&mut self, key: &str, value: bool, comp: Comparator) {
        self.elements.push(Predicate {
            key: key.to_string(),
            comp,
            value: PredicateValue::Bool(value),
        });
    }

    /// Whether the object passes every predicate.
    pub fn matches(&self, obj: &dyn Object) -> bool {
        self.elements.iter().all(|p| p.matches(obj))
    }
}

impl Predicate {
    fn matches(&self, obj: &dyn Object) -> bool {
        match &self.value {
            PredicateValue::Str(pivot) => {
                let Ok(s) = obj.get_str(&self.key) else {
                    return false;
                };
                match self.comp {
                    Comparator::In => s.contains(pivot.as_str()),
                    Comparator::Re => false, // unreachable; Re carries a Regex
                    comp => ordering_passes(comp, s.as_str().cmp(pivot.as_str())),
                }
            }
            PredicateValue::Re(re) => {
                let Ok(s) = obj.get_str(&self.key) else {
                    return false;
                };
                re.is_match(&s)
            }
            PredicateValue::Num {
                value,
                intsplit,
                adjusted,
            } => {
                let Ok(n) = obj.get_s64(&self.key) else {
                    return false;
                };
                if !adjusted.get() {
                    if let (Some(fs), Some(ps)) = (
                        *intsplit,
                        obj.find_property(&self.key).and_then(|p| p.intextra),
                    ) {
                        if fs != ps {
                            let fs = i64::from(fs);
                            let v = value.get();
                            value.set((v / fs) * i64::from(ps) + (v % fs));
                            adjusted.set(true);
                        }
                    }
                }
                ordering_passes(self.comp, n.cmp(&value.get()))
            }
            PredicateValue::Dbl(pivot) => {
                let Ok(d) = obj.get_dbl(&self.key) else {
                    return false;
                };
                match d.partial_cmp(pivot) {
                    Some(ord) => ordering_passes(self.comp, ord),
                    None => false,
                }
            }
            PredicateValue::Bool(pivot) => {
                let Ok(b) = obj.get_bool(&self.key) else {
                    return false;
                };
                match self.comp {
                    Comparator::Eq => b == *pivot,
                    // Ordering/containment on booleans evaluates as pass.
                    _ => true,
                }
            }
        }
    }
}

/// A property name plus direction for sorting object sets.
#[derive(Clone, Debug)]
pub struct SortKey {
    pub key: String,
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(key: &str) -> Self {
        SortKey {
            key: key.to_string(),
            descending: false,
        }
    }

    pub fn descending(key: &str) -> Self {
        SortKey {
            key: key.to_string(),
            descending: true,
        }
    }
}

/// Compares two objects under a sort key. The property is resolved against
/// the first object; values are read from both with the same key.
///
/// Enumerated properties (a value-to-label provider without the raw-order
/// flag) compare by their rendered display label so they sort by what the
/// user sees; everything else compares natively per declared type.
pub(crate) fn sort_compare(key: &SortKey, a: &dyn Object, b: &dyn Object) -> Ordering {
    let Some(prop) = a.find_property(&key.key) else {
        return Ordering::Equal;
    };

    let ord = if prop.sorts_by_label() {
        let la = a.render(&key.key).unwrap_or_default();
        let lb = b.render(&key.key).unwrap_or_default();
        la.cmp(&lb)
    } else {
        match prop.ptype {
            PropertyType::Str => {
                let sa = a.get_str(&key.key).unwrap_or_default();
                let sb = b.get_str(&key.key).unwrap_or_default();
                sa.cmp(&sb)
            }
            PropertyType::Bool => {
                let ba = a.get_bool(&key.key).unwrap_or_default();
                let bb = b.get_bool(&key.key).unwrap_or_default();
                ba.cmp(&bb)
            }
            PropertyType::Dbl => {
                let da = a.get_dbl(&key.key).unwrap_or_default();
                let db = b.get_dbl(&key.key).unwrap_or_default();
                da.partial_cmp(&db).unwrap_or(Ordering::Equal)
            }
            PropertyType::StrList => {
                let la = a.get_strlist(&key.key).unwrap_or_default();
                let lb = b.get_strlist(&key.key).unwrap_or_default();
                la.cmp(&lb)
            }
            _ => {
                let na = a.get_s64(&key.key).unwrap_or_default();
                let nb = b.get_s64(&key.key).unwrap_or_default();
                na.cmp(&nb)
            }
        }
    };

    if key.descending {
        ord.reverse()
    } else {
        ord
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("predicates", &self.elements.len())
            .finish()
    }
}
