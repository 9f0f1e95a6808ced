use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::r#trait::{Document, DocumentStore, Query, StoreError};

#[derive(Debug)]
struct Table<D: Document> {
    rows: BTreeMap<u64, D>,
    index: HashMap<D::Id, u64>,
    next_seq: u64,
}

impl<D: Document> Default for Table<D> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }
}

/// In-memory document table.
///
/// Intended for tests/dev. Rows are kept in insertion order.
#[derive(Debug)]
pub struct InMemoryDocumentStore<D: Document> {
    table: RwLock<Table<D>>,
}

impl<D: Document> InMemoryDocumentStore<D> {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Put a fully-formed document in place, bypassing id assignment.
    ///
    /// Lets tests and fixtures stage records that normal writes cannot
    /// produce (orphans, corrupted chains).
    pub fn seed(&self, doc: D) -> Result<(), StoreError> {
        let mut table = self.write()?;
        let id = doc.id();
        match table.index.get(&id).copied() {
            Some(seq) => {
                table.rows.insert(seq, doc);
            }
            None => {
                let seq = table.next_seq;
                table.next_seq += 1;
                table.index.insert(id, seq);
                table.rows.insert(seq, doc);
            }
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Table<D>>, StoreError> {
        self.table
            .read()
            .map_err(|_| StoreError::Poisoned { table: D::TABLE })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Table<D>>, StoreError> {
        self.table
            .write()
            .map_err(|_| StoreError::Poisoned { table: D::TABLE })
    }
}

impl<D: Document> Default for InMemoryDocumentStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Document> DocumentStore<D> for InMemoryDocumentStore<D> {
    fn get(&self, id: D::Id) -> Result<Option<D>, StoreError> {
        let table = self.read()?;
        Ok(table
            .index
            .get(&id)
            .and_then(|seq| table.rows.get(seq))
            .cloned())
    }

    fn insert(&self, record: D::Record) -> Result<D::Id, StoreError> {
        let id = D::new_id();
        self.seed(D::from_record(id, record))?;
        Ok(id)
    }

    fn patch(&self, id: D::Id, patch: D::Patch) -> Result<(), StoreError> {
        let mut table = self.write()?;
        let seq = table
            .index
            .get(&id)
            .copied()
            .ok_or_else(|| StoreError::missing::<D>(id))?;
        let doc = table
            .rows
            .get_mut(&seq)
            .ok_or_else(|| StoreError::missing::<D>(id))?;
        doc.apply_patch(patch);
        Ok(())
    }

    fn delete(&self, id: D::Id) -> Result<(), StoreError> {
        let mut table = self.write()?;
        let seq = table
            .index
            .remove(&id)
            .ok_or_else(|| StoreError::missing::<D>(id))?;
        table.rows.remove(&seq);
        Ok(())
    }

    fn collect(&self, query: &Query<D>) -> Result<Vec<D>, StoreError> {
        let table = self.read()?;
        Ok(table
            .rows
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect())
    }

    fn first(&self, query: &Query<D>) -> Result<Option<D>, StoreError> {
        let table = self.read()?;
        Ok(table.rows.values().find(|doc| query.matches(doc)).cloned())
    }
}
