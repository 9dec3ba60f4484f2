//! Deterministic `HashMap` and `HashSet` variants used for the engine's
//! unordered side tables (class names, link adjacency). The standard library
//! containers are randomly seeded; a reflection engine that backs
//! configuration files and API responses should enumerate the same way on
//! every run.
//!
//! The aliased types lack the inherent `new` constructor of their std
//! counterparts; use `HashMap::default()` / `HashSet::default()`.

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
