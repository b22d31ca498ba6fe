//! # CLI Command Implementations
//!
//! Every mutating command loads the world from redb, runs one core
//! operation, and commits the touched entities in a single transaction.

use std::path::{Path, PathBuf};
use tracing::info;
use wirenet_core::formats::{MAX_SNAPSHOT_SIZE, SerializableWorld, world_crypto_hash};
use wirenet_core::{
    ConnectionService, DropLedger, EntityId, EntityKind, Grid, Position, RedbWorld, Satchel,
    WireNetError, WireNode, WireType, drop_all, drop_all_for, world_checksum, world_from_bytes,
    world_to_bytes,
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for import; matches the snapshot decoder's limit.
const MAX_IMPORT_FILE_SIZE: u64 = MAX_SNAPSHOT_SIZE as u64;

/// Inventory room of a remover: large enough that refunds never overflow.
const REMOVER_CAPACITY: u32 = u32::MAX;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), WireNetError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| WireNetError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(WireNetError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, WireNetError> {
    let canonical = path.canonicalize().map_err(|e| {
        WireNetError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(WireNetError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path against its canonical parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, WireNetError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        WireNetError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(WireNetError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| WireNetError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new world database.
pub fn cmd_init(db_path: &Path, json_mode: bool, force: bool) -> Result<(), WireNetError> {
    if db_path.exists() {
        if !force {
            return Err(WireNetError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| WireNetError::IoError(format!("Remove db: {}", e)))?;
    }

    let _store = RedbWorld::open(db_path)?;
    info!(db = %db_path.display(), "initialized world database");

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "initialized": true
        }));
    } else {
        println!("Initialized new world database at {:?}", db_path);
    }
    Ok(())
}

// =============================================================================
// PLACE / REMOVE COMMANDS
// =============================================================================

/// Place an entity.
pub fn cmd_place(
    db_path: &Path,
    json_mode: bool,
    kind: EntityKind,
    at: Position,
) -> Result<(), WireNetError> {
    let mut store = RedbWorld::open(db_path)?;
    let mut grid = store.load()?;

    let id = grid.place(kind, at)?;
    store.commit(&grid, &[id])?;
    info!(entity = %id, %kind, %at, "placed");

    if json_mode {
        print_json(&serde_json::json!({
            "entity_id": id.0,
            "kind": kind,
            "origin": at.to_string(),
            "slots": kind.slot_count()
        }));
    } else {
        println!("Placed {} {} at {}", kind, id, at);
    }
    Ok(())
}

/// Remove the entity occupying `at`, detaching its links and refunding wires.
pub fn cmd_remove(
    db_path: &Path,
    json_mode: bool,
    at: Position,
    spools: u32,
) -> Result<(), WireNetError> {
    let mut store = RedbWorld::open(db_path)?;
    let mut grid = store.load()?;

    let Some(id) = grid.entity_at(at).map(|e| e.id()) else {
        if json_mode {
            print_json(&serde_json::json!({
                "removed": false,
                "position": at.to_string()
            }));
        } else {
            println!("Nothing at {}", at);
        }
        return Ok(());
    };

    let mut ledger = DropLedger::default();
    let mut actor = Satchel::new(spools, REMOVER_CAPACITY);
    let mut touched = vec![id];
    if let Some(node) = ConnectionService::get_wire_node(&grid, at) {
        touched.extend(peer_entities(&grid, node));
        if spools > 0 {
            drop_all_for(node, &mut actor, &mut ledger);
        } else {
            drop_all(node, &mut ledger);
        }
    }

    let detached = ConnectionService::detach_all(&mut grid, at)?;
    grid.remove(id);
    store.commit(&grid, &touched)?;
    info!(entity = %id, %at, detached, "removed");

    if json_mode {
        print_json(&serde_json::json!({
            "entity_id": id.0,
            "links_removed": detached,
            "refunded": actor.held(),
            "spools_left": actor.spools(),
            "dropped": ledger.drops
        }));
    } else {
        println!("Removed {} ({} links)", id, detached);
        for stack in actor.held() {
            println!("  refunded {} x{}", stack.item, stack.count);
        }
        for (pos, stack) in &ledger.drops {
            println!("  dropped  {} x{} at {}", stack.item, stack.count, pos);
        }
    }
    Ok(())
}

/// Entities on the far side of each linked slot of `node`.
fn peer_entities(grid: &Grid, node: &dyn WireNode) -> Vec<EntityId> {
    let mut peers: Vec<EntityId> = node
        .connected_slots()
        .iter()
        .filter_map(|&slot| node.peer_position(slot))
        .filter_map(|pos| grid.entity_at(pos).map(|e| e.id()))
        .collect();
    peers.sort();
    peers.dedup();
    peers
}

// =============================================================================
// CONNECT / DISCONNECT COMMANDS
// =============================================================================

/// First open slot at `pos`, or -1 when there is none.
fn first_open_slot(grid: &Grid, pos: Position) -> i32 {
    ConnectionService::get_wire_node(grid, pos)
        .and_then(|node| node.find_open_slot(0, node.slot_count()))
        .and_then(|slot| i32::try_from(slot).ok())
        .unwrap_or(-1)
}

/// Ids of the entities at both positions.
fn pair_ids(grid: &Grid, a: Position, b: Position) -> Vec<EntityId> {
    [a, b]
        .into_iter()
        .filter_map(|pos| grid.entity_at(pos).map(|e| e.id()))
        .collect()
}

/// Link two entities.
pub fn cmd_connect(
    db_path: &Path,
    json_mode: bool,
    from: Position,
    to: Position,
    from_slot: Option<i32>,
    to_slot: Option<i32>,
    wire: WireType,
) -> Result<(), WireNetError> {
    let mut store = RedbWorld::open(db_path)?;
    let mut grid = store.load()?;

    let result = match (from_slot, to_slot) {
        (None, None) => ConnectionService::connect_auto(&mut grid, from, to, wire)?,
        (a, b) => {
            let a = a.unwrap_or_else(|| first_open_slot(&grid, from));
            let b = b.unwrap_or_else(|| first_open_slot(&grid, to));
            ConnectionService::connect(&mut grid, from, a, to, b, wire)?
        }
    };

    if result.is_linked() {
        store.commit(&grid, &pair_ids(&grid, from, to))?;
    }
    info!(%from, %to, %wire, ?result, "connect");

    if json_mode {
        print_json(&serde_json::json!({
            "from": from.to_string(),
            "to": to.to_string(),
            "wire": wire,
            "result": result,
            "linked": result.is_linked()
        }));
    } else {
        println!("{} -> {} ({}): {:?}", from, to, wire, result);
    }
    Ok(())
}

/// Unlink two entities.
pub fn cmd_disconnect(
    db_path: &Path,
    json_mode: bool,
    from: Position,
    to: Position,
) -> Result<(), WireNetError> {
    let mut store = RedbWorld::open(db_path)?;
    let mut grid = store.load()?;

    let result = ConnectionService::disconnect(&mut grid, from, to)?;
    if result == wirenet_core::DisconnectResult::Removed {
        store.commit(&grid, &pair_ids(&grid, from, to))?;
    }
    info!(%from, %to, ?result, "disconnect");

    if json_mode {
        print_json(&serde_json::json!({
            "from": from.to_string(),
            "to": to.to_string(),
            "result": result
        }));
    } else {
        println!("{} -x- {}: {:?}", from, to, result);
    }
    Ok(())
}

// =============================================================================
// INSPECT / STATUS COMMANDS
// =============================================================================

/// Show the entity at a position.
pub fn cmd_inspect(db_path: &Path, json_mode: bool, at: Position) -> Result<(), WireNetError> {
    let store = RedbWorld::open(db_path)?;
    let grid = store.load()?;

    let Some(entity) = grid.entity_at(at) else {
        if json_mode {
            print_json(&serde_json::json!({ "position": at.to_string(), "entity": null }));
        } else {
            println!("Nothing at {}", at);
        }
        return Ok(());
    };

    let slots: Vec<_> = entity
        .as_wire_node()
        .map(|node| {
            (0..node.slot_count())
                .map(|slot| {
                    (
                        slot,
                        node.slot_at(slot).and_then(|ep| ep.peer()),
                        node.is_input(slot),
                        node.is_output(slot),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    if json_mode {
        let slots_json: Vec<_> = slots
            .iter()
            .map(|(slot, peer, input, output)| {
                serde_json::json!({
                    "slot": slot,
                    "input": input,
                    "output": output,
                    "peer": peer.map(|p| p.pos.to_string()),
                    "peer_slot": peer.map(|p| p.slot),
                    "wire": peer.map(|p| p.wire)
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "entity_id": entity.id().0,
            "kind": entity.kind(),
            "origin": entity.origin().to_string(),
            "slots": slots_json
        }));
        return Ok(());
    }

    println!("{} {} at {}", entity.kind(), entity.id(), entity.origin());
    if slots.is_empty() {
        println!("  (no connection slots)");
    }
    for (slot, peer, input, output) in slots {
        let dir = match (input, output) {
            (true, true) => "io",
            (true, false) => "in",
            (false, true) => "out",
            (false, false) => "-",
        };
        match peer {
            Some(p) => println!(
                "  [{}] {:<3} -> {} slot {} ({})",
                slot, dir, p.pos, p.slot, p.wire
            ),
            None => println!("  [{}] {:<3} open", slot, dir),
        }
    }
    Ok(())
}

/// Show world status.
pub fn cmd_status(db_path: &Path, json_mode: bool) -> Result<(), WireNetError> {
    let store = RedbWorld::open(db_path)?;
    let grid = store.load()?;
    let links = ConnectionService::links(&grid);
    let dangling = ConnectionService::dangling(&grid);

    let mut per_wire = [0usize; WireType::COUNT];
    for link in &links {
        per_wire[link.wire.index()] += 1;
    }

    if json_mode {
        let by_wire: serde_json::Map<String, serde_json::Value> = WireType::ALL
            .iter()
            .map(|w| (w.name().to_string(), per_wire[w.index()].into()))
            .collect();
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "entity_count": grid.entity_count(),
            "link_count": links.len(),
            "links_by_wire": by_wire,
            "dangling_slots": dangling.len(),
            "next_entity_id": grid.next_entity_id()
        }));
        return Ok(());
    }

    println!("Wirenet World Status");
    println!("====================");
    println!("Database: {:?}", db_path);
    println!();
    println!("Entities:       {}", grid.entity_count());
    println!("Links:          {}", links.len());
    for wire in WireType::ALL {
        println!("  {:<12} {}", wire.name(), per_wire[wire.index()]);
    }
    println!("Dangling slots: {}", dangling.len());
    for end in dangling {
        println!("  {} slot {}", end.pos, end.slot);
    }

    Ok(())
}

// =============================================================================
// EXPORT / IMPORT / HASH COMMANDS
// =============================================================================

/// Export the world.
pub fn cmd_export(
    db_path: &Path,
    json_mode: bool,
    output: &Path,
    format: &str,
) -> Result<(), WireNetError> {
    let validated_output = validate_output_path(output)?;

    let store = RedbWorld::open(db_path)?;
    let grid = store.load()?;
    let checksum = world_checksum(&grid)?;

    let data = match format {
        "snapshot" => world_to_bytes(&grid)?,
        "json" => serde_json::to_vec_pretty(&SerializableWorld::from(&grid))
            .map_err(|e| WireNetError::SerializationError(e.to_string()))?,
        _ => {
            return Err(WireNetError::SerializationError(format!(
                "Unknown format: {}. Use: snapshot, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| WireNetError::IoError(format!("Write file: {}", e)))?;

    if json_mode {
        print_json(&serde_json::json!({
            "format": format,
            "bytes": data.len(),
            "checksum": checksum,
            "path": validated_output.display().to_string()
        }));
    } else {
        println!("Checksum: {}", checksum);
        println!("Exported {} bytes to {:?}", data.len(), validated_output);
    }
    Ok(())
}

/// Parse an export file, snapshot first, then JSON.
pub fn parse_export(data: &[u8]) -> Result<Grid, WireNetError> {
    match world_from_bytes(data) {
        Ok(grid) => Ok(grid),
        Err(snapshot_err) => serde_json::from_slice::<SerializableWorld>(data)
            .map_err(|_| snapshot_err)
            .and_then(Grid::try_from),
    }
}

/// Replace the world from an export file.
pub fn cmd_import(db_path: &Path, json_mode: bool, input: &Path) -> Result<(), WireNetError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| WireNetError::IoError(format!("Read file: {}", e)))?;
    let grid = parse_export(&data)?;

    let mut store = RedbWorld::open(db_path)?;
    store.replace(&grid)?;
    info!(entities = grid.entity_count(), "imported world");

    if json_mode {
        print_json(&serde_json::json!({
            "entity_count": grid.entity_count(),
            "link_count": grid.link_count()
        }));
    } else {
        println!(
            "Imported world: {} entities, {} links",
            grid.entity_count(),
            grid.link_count()
        );
    }
    Ok(())
}

/// Print the BLAKE3 hash of the world snapshot.
pub fn cmd_hash(db_path: &Path, json_mode: bool) -> Result<(), WireNetError> {
    let store = RedbWorld::open(db_path)?;
    let grid = store.load()?;
    let hash = world_crypto_hash(&grid)?;
    let checksum = world_checksum(&grid)?;

    if json_mode {
        print_json(&serde_json::json!({
            "algorithm": "blake3",
            "hash": hash,
            "checksum": checksum,
            "entity_count": grid.entity_count()
        }));
    } else {
        println!("BLAKE3:   {}", hash);
        println!("Checksum: {}", checksum);
    }
    Ok(())
}
