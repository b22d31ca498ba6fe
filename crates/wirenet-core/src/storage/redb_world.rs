//! # redb-backed World Storage
//!
//! Persists entities and their slot records in a redb database.
//!
//! Each entity is one row keyed by its id; the value is the postcard
//! encoding of an `EntityRow`. A connect or disconnect touches two
//! entities, and both rows are written in a single transaction so a crash
//! can never leave one side of a link on disk without the other.

use crate::formats::{EntityRow, SerializableWorld};
use crate::world::Grid;
use crate::{EntityId, WireNetError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;
use tracing::debug;

/// Table for entities: EntityId(u64) -> serialized EntityRow bytes
const ENTITIES: TableDefinition<u64, &[u8]> = TableDefinition::new("entities");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_ENTITY_ID: &str = "next_entity_id";

fn io_err(e: impl std::fmt::Display) -> WireNetError {
    WireNetError::IoError(e.to_string())
}

/// A disk-backed world store.
pub struct RedbWorld {
    db: Database,
    next_entity_id: u64,
}

impl std::fmt::Debug for RedbWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbWorld")
            .field("next_entity_id", &self.next_entity_id)
            .finish_non_exhaustive()
    }
}

impl RedbWorld {
    /// Open or create a world database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WireNetError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(ENTITIES).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let next_entity_id = {
            let read_txn = db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            table
                .get(NEXT_ENTITY_ID)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0)
        };

        Ok(Self { db, next_entity_id })
    }

    /// The id counter as last committed.
    #[must_use]
    pub fn next_entity_id(&self) -> u64 {
        self.next_entity_id
    }

    /// Load the whole world into memory.
    pub fn load(&self) -> Result<Grid, WireNetError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ENTITIES).map_err(io_err)?;

        let mut entities = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            let row: EntityRow = postcard::from_bytes(value.value())
                .map_err(|e| WireNetError::DeserializationError(e.to_string()))?;
            entities.push(row);
        }

        Grid::try_from(SerializableWorld {
            next_entity_id: self.next_entity_id,
            entities,
        })
    }

    /// Write the rows of `touched` entities in one transaction.
    ///
    /// An id absent from `grid` has its row deleted.
    pub fn commit(&mut self, grid: &Grid, touched: &[EntityId]) -> Result<(), WireNetError> {
        let next_entity_id = self.next_entity_id.max(grid.next_entity_id());

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut entities = write_txn.open_table(ENTITIES).map_err(io_err)?;
            for &id in touched {
                match grid.entity(id) {
                    Some(entity) => {
                        let bytes = postcard::to_allocvec(&EntityRow::from_entity(entity))
                            .map_err(|e| WireNetError::SerializationError(e.to_string()))?;
                        entities.insert(id.0, bytes.as_slice()).map_err(io_err)?;
                    }
                    None => {
                        entities.remove(id.0).map_err(io_err)?;
                    }
                }
            }

            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(NEXT_ENTITY_ID, next_entity_id)
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        // Update in-memory state only after successful commit.
        self.next_entity_id = next_entity_id;
        debug!(rows = touched.len(), "committed entities");
        Ok(())
    }

    /// Replace the stored world with `grid`.
    pub fn replace(&mut self, grid: &Grid) -> Result<(), WireNetError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut entities = write_txn.open_table(ENTITIES).map_err(io_err)?;
            let stale: Vec<u64> = {
                let mut keys = Vec::new();
                for entry in entities.iter().map_err(io_err)? {
                    let (key, _) = entry.map_err(io_err)?;
                    keys.push(key.value());
                }
                keys
            };
            for key in stale {
                entities.remove(key).map_err(io_err)?;
            }
            for entity in grid.entities() {
                let bytes = postcard::to_allocvec(&EntityRow::from_entity(entity))
                    .map_err(|e| WireNetError::SerializationError(e.to_string()))?;
                entities
                    .insert(entity.id().0, bytes.as_slice())
                    .map_err(io_err)?;
            }

            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(NEXT_ENTITY_ID, grid.next_entity_id())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        self.next_entity_id = grid.next_entity_id();
        Ok(())
    }

    /// Delete one entity row. Returns whether it existed.
    pub fn delete(&mut self, id: EntityId) -> Result<bool, WireNetError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let existed = {
            let mut entities = write_txn.open_table(ENTITIES).map_err(io_err)?;
            entities.remove(id.0).map_err(io_err)?.is_some()
        };
        write_txn.commit().map_err(io_err)?;
        Ok(existed)
    }

    /// Number of stored entities.
    pub fn entity_count(&self) -> Result<usize, WireNetError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ENTITIES).map_err(io_err)?;
        let count = table.len().map_err(io_err)?;
        Ok(count as usize)
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), WireNetError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectResult, ConnectionService};
    use crate::entity::EntityKind;
    use crate::{Position, WireType};
    use tempfile::tempdir;

    #[test]
    fn empty_database_loads_empty_world() {
        let temp = tempdir().expect("temp dir");
        let store = RedbWorld::open(temp.path().join("world.redb")).expect("open db");

        let grid = store.load().expect("load");
        assert_eq!(grid.entity_count(), 0);
        assert_eq!(store.entity_count().expect("count"), 0);
    }

    #[test]
    fn commit_persists_both_sides_of_link() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("world.redb");
        let a = Position::new(0, 0, 0);
        let b = Position::new(3, 0, 0);

        {
            let mut store = RedbWorld::open(&db_path).expect("open db");
            let mut grid = store.load().expect("load");
            let ia = grid.place(EntityKind::SmallConnector, a).expect("place");
            let ib = grid.place(EntityKind::SmallConnector, b).expect("place");
            let result =
                ConnectionService::connect(&mut grid, a, 0, b, 2, WireType::Copper).expect("io");
            assert_eq!(result, ConnectResult::Bidirectional);
            store.commit(&grid, &[ia, ib]).expect("commit");
        }

        // Reopen and verify
        {
            let store = RedbWorld::open(&db_path).expect("reopen db");
            let grid = store.load().expect("load");
            assert_eq!(store.entity_count().expect("count"), 2);
            assert_eq!(store.next_entity_id(), 2);
            assert_eq!(grid.link_count(), 1);
            assert_eq!(
                ConnectionService::type_of_connection(&grid, a, b),
                Some(WireType::Copper)
            );
        }
    }

    #[test]
    fn commit_removes_missing_entities() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbWorld::open(temp.path().join("world.redb")).expect("open db");
        let mut grid = Grid::new();
        let id = grid
            .place(EntityKind::Block, Position::new(1, 1, 1))
            .expect("place");
        store.commit(&grid, &[id]).expect("commit");
        assert_eq!(store.entity_count().expect("count"), 1);

        grid.remove(id);
        store.commit(&grid, &[id]).expect("commit");
        assert_eq!(store.entity_count().expect("count"), 0);

        // Ids stay reserved after removal
        let reloaded = store.load().expect("load");
        assert_eq!(reloaded.next_entity_id(), 1);
    }

    #[test]
    fn replace_overwrites_contents() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbWorld::open(temp.path().join("world.redb")).expect("open db");

        let mut first = Grid::new();
        let old = first
            .place(EntityKind::LargeConnector, Position::new(0, 0, 0))
            .expect("place");
        store.commit(&first, &[old]).expect("commit");

        let mut second = Grid::new();
        second
            .place(EntityKind::Accumulator, Position::new(5, 5, 5))
            .expect("place");
        second
            .place(EntityKind::Block, Position::new(6, 5, 5))
            .expect("place");
        store.replace(&second).expect("replace");

        let loaded = store.load().expect("load");
        assert_eq!(loaded.entity_count(), 2);
        assert_eq!(
            loaded.entity(EntityId(0)).map(|e| e.kind()),
            Some(EntityKind::Accumulator)
        );
    }

    #[test]
    fn delete_reports_existence() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbWorld::open(temp.path().join("world.redb")).expect("open db");
        let mut grid = Grid::new();
        let id = grid
            .place(EntityKind::SmallConnector, Position::default())
            .expect("place");
        store.commit(&grid, &[id]).expect("commit");

        assert!(store.delete(id).expect("delete"));
        assert!(!store.delete(id).expect("delete"));
    }

    #[test]
    fn compact_keeps_data() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbWorld::open(temp.path().join("world.redb")).expect("open db");
        let mut grid = Grid::new();
        let id = grid
            .place(EntityKind::SmallConnector, Position::default())
            .expect("place");
        store.commit(&grid, &[id]).expect("commit");
        store.compact().expect("compact");
        assert_eq!(store.entity_count().expect("count"), 1);
    }
}
