//! Class identity for suite lookup.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A type that can back a suite.
///
/// The instance is built with `Default` when its suite starts and is shared by
/// every hook and test of that suite run.
pub trait Fixture: Default + Send + 'static {}

impl<T: Default + Send + 'static> Fixture for T {}

/// Identity of a test class.
///
/// Keyed by `TypeId`, so two types that share a name never share a suite.
/// The type name is carried only for display.
#[derive(Clone, Copy)]
pub struct ClassId {
    type_id: TypeId,
    name: &'static str,
}

impl ClassId {
    /// Identity of the fixture type `T`.
    pub fn of<T: 'static>() -> Self {
        ClassId {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified type name (e.g. `my_tests::link::LinkSuite`).
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name (e.g. `LinkSuite`).
    pub fn short_name(self) -> &'static str {
        // Generic arguments may contain `::`, so split before the first `<`.
        let base = self.name.split('<').next().unwrap_or(self.name);
        let start = base.rfind("::").map_or(0, |i| i + 2);
        &self.name[start..]
    }
}

impl PartialEq for ClassId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.name)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
