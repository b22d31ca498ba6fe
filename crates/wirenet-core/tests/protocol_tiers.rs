//! # Protocol Tier Tests (T0-T3)
//!
//! End-to-end scenarios across the world, protocol, drops and storage.
//!
//! ## Tiers
//! - T0: Resolution
//! - T1: Linking
//! - T2: Removal
//! - T3: Persistence

use wirenet_core::{
    ConnectResult, ConnectionService, DisconnectResult, DropLedger, EntityKind, Grid, Position,
    RedbWorld, ResourceStack, Satchel, WireType, drop_all, drop_all_for,
};

fn place_all(kinds: &[(EntityKind, Position)]) -> Grid {
    let mut grid = Grid::new();
    for &(kind, pos) in kinds {
        grid.place(kind, pos).expect("place");
    }
    grid
}

// =============================================================================
// TIER T0: RESOLUTION
// =============================================================================

mod t0_resolution {
    use super::*;

    /// T0.1: Any cell of a multi-block entity addresses the same node.
    #[test]
    fn upper_cell_resolves_to_owner() {
        let acc = Position::new(0, 64, 0);
        let grid = place_all(&[(EntityKind::Accumulator, acc)]);

        let lower = ConnectionService::get_wire_node(&grid, acc).expect("lower");
        let upper = ConnectionService::get_wire_node(&grid, acc.offset(0, 1, 0)).expect("upper");
        assert_eq!(lower.my_pos(), upper.my_pos());
    }

    /// T0.2: Inert entities and empty cells have no capability.
    #[test]
    fn inert_and_empty_are_invalid() {
        let node = Position::new(0, 0, 0);
        let block = Position::new(2, 0, 0);
        let mut grid = place_all(&[
            (EntityKind::SmallConnector, node),
            (EntityKind::Block, block),
        ]);

        assert!(ConnectionService::get_wire_node(&grid, block).is_none());
        assert_eq!(
            ConnectionService::connect(&mut grid, node, 0, block, 0, WireType::Copper)
                .expect("connect"),
            ConnectResult::Invalid
        );
        assert_eq!(
            ConnectionService::disconnect(&mut grid, node, Position::new(9, 9, 9))
                .expect("disconnect"),
            DisconnectResult::Invalid
        );
        assert_eq!(
            ConnectionService::disconnect(&mut grid, node, block).expect("disconnect"),
            DisconnectResult::Invalid
        );
        assert_eq!(
            ConnectionService::disconnect(&mut grid, block, node).expect("disconnect"),
            DisconnectResult::Invalid
        );
    }
}

// =============================================================================
// TIER T1: LINKING
// =============================================================================

mod t1_linking {
    use super::*;

    /// T1.1: Linking through the upper cell stores the owner's origin.
    #[test]
    fn link_via_upper_cell() {
        let small = Position::new(0, 65, 0);
        let acc = Position::new(3, 64, 0);
        let mut grid = place_all(&[
            (EntityKind::SmallConnector, small),
            (EntityKind::Accumulator, acc),
        ]);

        let result = ConnectionService::connect(
            &mut grid,
            small,
            0,
            acc.offset(0, 1, 0),
            5,
            WireType::Gold,
        )
        .expect("connect");
        assert_eq!(result, ConnectResult::Output);

        let node = ConnectionService::get_wire_node(&grid, small).expect("small");
        assert_eq!(node.peer_position(0), Some(acc));

        // Either cell finds the link again
        assert_eq!(
            ConnectionService::connect(&mut grid, small, 1, acc, 6, WireType::Gold)
                .expect("connect"),
            ConnectResult::AlreadyExists
        );
        assert_eq!(
            ConnectionService::disconnect(&mut grid, acc.offset(0, 1, 0), small)
                .expect("disconnect"),
            DisconnectResult::Removed
        );
        assert_eq!(grid.link_count(), 0);
    }

    /// T1.2: A hub fills its slots and then reports Count.
    #[test]
    fn hub_fills_up() {
        let hub = Position::new(0, 0, 0);
        let mut grid = place_all(&[(EntityKind::SmallConnector, hub)]);
        let mut results = Vec::new();
        for x in 1..=5 {
            let leaf = Position::new(x, 0, 0);
            grid.place(EntityKind::LargeConnector, leaf).expect("place");
            results.push(
                ConnectionService::connect_auto(&mut grid, hub, leaf, WireType::Copper)
                    .expect("connect"),
            );
        }

        assert_eq!(
            results,
            vec![
                ConnectResult::Bidirectional,
                ConnectResult::Bidirectional,
                ConnectResult::Bidirectional,
                ConnectResult::Bidirectional,
                ConnectResult::Count,
            ]
        );
        assert_eq!(grid.link_count(), 4);
        assert!(ConnectionService::dangling(&grid).is_empty());
    }

    /// T1.3: Festive wire is shorter than the protocol bound.
    #[test]
    fn festive_span_limited() {
        let a = Position::new(0, 0, 0);
        let b = Position::new(10, 0, 0);
        let mut grid = place_all(&[
            (EntityKind::SmallConnector, a),
            (EntityKind::SmallConnector, b),
        ]);

        assert_eq!(
            ConnectionService::connect(&mut grid, a, 0, b, 0, WireType::Festive).expect("connect"),
            ConnectResult::TooLong
        );
        assert_eq!(
            ConnectionService::connect(&mut grid, a, 0, b, 0, WireType::Copper).expect("connect"),
            ConnectResult::Bidirectional
        );
    }
}

// =============================================================================
// TIER T2: REMOVAL
// =============================================================================

mod t2_removal {
    use super::*;

    /// T2.1: Removing an entity clears its peers and refunds its wires.
    #[test]
    fn remove_entity_refunds_and_detaches() {
        let hub = Position::new(0, 0, 0);
        let leaves = [
            Position::new(2, 0, 0),
            Position::new(0, 0, 2),
            Position::new(-2, 0, 0),
        ];
        let mut grid = place_all(&[(EntityKind::LargeConnector, hub)]);
        for (leaf, wire) in leaves
            .iter()
            .zip([WireType::Copper, WireType::Gold, WireType::Copper])
        {
            grid.place(EntityKind::SmallConnector, *leaf).expect("place");
            ConnectionService::connect_auto(&mut grid, hub, *leaf, wire).expect("connect");
        }

        let mut ledger = DropLedger::default();
        let node = ConnectionService::get_wire_node(&grid, hub).expect("hub");
        drop_all(node, &mut ledger);
        assert_eq!(
            ledger.drops,
            vec![
                (hub, ResourceStack::new("copper_wire", 2)),
                (hub, ResourceStack::new("gold_wire", 1)),
            ]
        );

        let cleared = ConnectionService::detach_all(&mut grid, hub).expect("detach");
        assert_eq!(cleared, 3);
        let id = grid.entity_at(hub).map(|e| e.id()).expect("hub entity");
        grid.remove(id);

        assert_eq!(grid.link_count(), 0);
        assert!(ConnectionService::dangling(&grid).is_empty());
    }

    /// T2.2: An actor with spools gets source drops, then plain wire.
    #[test]
    fn actor_refund_spends_spools() {
        let a = Position::new(0, 0, 0);
        let b = Position::new(1, 0, 0);
        let c = Position::new(0, 1, 0);
        let mut grid = place_all(&[
            (EntityKind::SmallConnector, a),
            (EntityKind::SmallConnector, b),
            (EntityKind::SmallConnector, c),
        ]);
        ConnectionService::connect_auto(&mut grid, a, b, WireType::Festive).expect("connect");
        ConnectionService::connect_auto(&mut grid, a, c, WireType::Festive).expect("connect");

        let mut actor = Satchel::new(1, 64);
        let mut ledger = DropLedger::default();
        let node = ConnectionService::get_wire_node(&grid, a).expect("node");
        drop_all_for(node, &mut actor, &mut ledger);

        assert_eq!(actor.spools(), 0);
        assert_eq!(
            actor.held(),
            &[
                ResourceStack::new("festive_spool", 1),
                ResourceStack::new("festive_wire", 1),
            ]
        );
        assert!(ledger.drops.is_empty());
    }
}

// =============================================================================
// TIER T3: PERSISTENCE
// =============================================================================

mod t3_persistence {
    use super::*;
    use tempfile::tempdir;

    /// T3.1: Links survive a store reopen and can be removed afterwards.
    #[test]
    fn links_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("world.redb");
        let a = Position::new(0, 64, 0);
        let acc = Position::new(0, 64, 5);

        {
            let mut store = RedbWorld::open(&db_path).expect("open db");
            let mut grid = store.load().expect("load");
            let ia = grid.place(EntityKind::LargeConnector, a).expect("place");
            let ib = grid.place(EntityKind::Accumulator, acc).expect("place");
            let result = ConnectionService::connect(&mut grid, a, 7, acc, 2, WireType::Gold)
                .expect("connect");
            assert_eq!(result, ConnectResult::Input);
            store.commit(&grid, &[ia, ib]).expect("commit");
        }

        let mut store = RedbWorld::open(&db_path).expect("reopen db");
        let mut grid = store.load().expect("load");
        assert_eq!(
            ConnectionService::type_of_connection(&grid, acc, a),
            Some(WireType::Gold)
        );

        assert_eq!(
            ConnectionService::disconnect(&mut grid, a, acc).expect("disconnect"),
            DisconnectResult::Removed
        );
        let touched: Vec<_> = grid.entities().map(|e| e.id()).collect();
        store.commit(&grid, &touched).expect("commit");

        let reloaded = store.load().expect("load");
        assert_eq!(reloaded.link_count(), 0);
        assert_eq!(reloaded.entity_count(), 2);
    }
}
