//! Column families
//!
//! A column family is an independent keyspace with its own memtable. The set
//! of families is fixed at open; the write path looks families up by id when
//! applying batches and when consulting memtables for flush scheduling.

use std::sync::Arc;

use crate::memtable::Memtable;

/// Identifier of a column family within one engine instance.
pub type ColumnFamilyId = u32;

/// Id of the default column family, always present.
pub const DEFAULT_CF_ID: ColumnFamilyId = 0;

/// Name of the default column family.
pub const DEFAULT_CF_NAME: &str = "default";

/// One keyspace: a name, a stable id, and the writable memtable.
#[derive(Debug)]
pub struct ColumnFamily {
    id: ColumnFamilyId,
    name: String,
    mem: Memtable,
}

impl ColumnFamily {
    fn new(id: ColumnFamilyId, name: impl Into<String>, write_buffer_size: usize) -> Self {
        Self {
            id,
            name: name.into(),
            mem: Memtable::new(write_buffer_size),
        }
    }

    /// Stable id of this family.
    pub fn id(&self) -> ColumnFamilyId {
        self.id
    }

    /// Human-readable name of this family.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The writable memtable.
    pub fn mem(&self) -> &Memtable {
        &self.mem
    }
}

/// The fixed registry of column families for one engine instance.
///
/// Ids are assigned densely from 0 in declaration order; id 0 is always the
/// default family, inserted implicitly when not named by the caller.
#[derive(Debug)]
pub struct ColumnFamilySet {
    families: Vec<Arc<ColumnFamily>>,
}

impl ColumnFamilySet {
    /// Builds a set from extra family names plus the implicit default.
    pub fn new(extra_names: &[&str], write_buffer_size: usize) -> Self {
        let mut families = Vec::with_capacity(extra_names.len() + 1);
        families.push(Arc::new(ColumnFamily::new(
            DEFAULT_CF_ID,
            DEFAULT_CF_NAME,
            write_buffer_size,
        )));
        for name in extra_names {
            let id = families.len() as ColumnFamilyId;
            families.push(Arc::new(ColumnFamily::new(id, *name, write_buffer_size)));
        }
        Self { families }
    }

    /// Looks a family up by id.
    pub fn family(&self, id: ColumnFamilyId) -> Option<&Arc<ColumnFamily>> {
        self.families.get(id as usize)
    }

    /// The default family.
    pub fn default_family(&self) -> &Arc<ColumnFamily> {
        &self.families[DEFAULT_CF_ID as usize]
    }

    /// Number of families in the set.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Whether the set is empty. Never true in practice: the default family
    /// always exists.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Iterates all families in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ColumnFamily>> {
        self.families.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_family_always_present() {
        let set = ColumnFamilySet::new(&[], 1024);
        assert_eq!(set.len(), 1);
        assert_eq!(set.default_family().id(), DEFAULT_CF_ID);
        assert_eq!(set.default_family().name(), DEFAULT_CF_NAME);
    }

    #[test]
    fn test_ids_assigned_in_declaration_order() {
        let set = ColumnFamilySet::new(&["index", "meta"], 1024);
        assert_eq!(set.len(), 3);
        assert_eq!(set.family(1).unwrap().name(), "index");
        assert_eq!(set.family(2).unwrap().name(), "meta");
        assert!(set.family(3).is_none());
    }
}
