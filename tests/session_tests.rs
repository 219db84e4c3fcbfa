use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use drydock::config::{DrydockConfig, FixtureConfig, Population};
use drydock::data::{
    generate_database, ComponentKind, ComponentParams, ComponentRecord, EngineParams, Field,
    HullParams, ShipRecord, ShipStore, WeaponParams,
};
use drydock::mutation::{Edit, Randomizer, Rng, Strategy};
use drydock::session::TestSession;
use drydock::verify::{enumerate_cases, reconcile, CheckCase, CheckFailure, Comparator};

fn unique_temp_dir(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("drydock-it-{name}-{stamp}"));
    fs::create_dir_all(&dir).expect("temp dir should be created");
    dir
}

fn weapon(id: &str, diameter: i64) -> ComponentRecord {
    ComponentRecord {
        id: id.to_string(),
        params: ComponentParams::Weapon(WeaponParams {
            reload_speed: 4,
            rotational_speed: 6,
            diameter,
            power_volley: 12,
            count: 2,
        }),
    }
}

fn hull(id: &str) -> ComponentRecord {
    ComponentRecord {
        id: id.to_string(),
        params: ComponentParams::Hull(HullParams {
            armor: 9,
            hull_type: 1,
            capacity: 14,
        }),
    }
}

fn engine(id: &str) -> ComponentRecord {
    ComponentRecord {
        id: id.to_string(),
        params: ComponentParams::Engine(EngineParams {
            power: 11,
            engine_type: 3,
        }),
    }
}

fn ship(id: &str, weapon: &str) -> ShipRecord {
    ShipRecord {
        id: id.to_string(),
        weapon: weapon.to_string(),
        hull: "Hull-1".to_string(),
        engine: "Engine-1".to_string(),
    }
}

/// Weapons 3, 5 and 7; ships 1..=4 referencing 3, 5, 5, 7.
fn hand_built_fixture(path: &PathBuf) {
    let store = ShipStore::create(path).expect("fixture should be created");
    for record in [
        weapon("Weapon-3", 8),
        weapon("Weapon-5", 10),
        weapon("Weapon-7", 15),
        hull("Hull-1"),
        engine("Engine-1"),
    ] {
        store.insert_component(&record).expect("component insert");
    }
    for (id, weapon) in [
        ("Ship-1", "Weapon-3"),
        ("Ship-2", "Weapon-5"),
        ("Ship-3", "Weapon-5"),
        ("Ship-4", "Weapon-7"),
    ] {
        store.insert_ship(&ship(id, weapon)).expect("ship insert");
    }
}

fn small_fixture() -> FixtureConfig {
    FixtureConfig {
        population: Population {
            weapons: 8,
            hulls: 3,
            engines: 3,
            ships: 40,
        },
        ..FixtureConfig::default()
    }
}

#[test]
fn every_session_reports_exactly_what_was_mutated() {
    let dir = unique_temp_dir("reconcile");
    let original = dir.join("ships.db");
    generate_database(&original, &small_fixture(), 21).expect("generate");

    let mut strategies = Vec::new();
    for seed in 0..24u64 {
        let config = DrydockConfig::default()
            .with_database(&original)
            .with_seed(seed);
        let session = TestSession::start(&config).expect("session should start");
        let report = session.run();
        let outcome = reconcile(session.mutation_log(), session.original(), &report)
            .expect("reconcile should read the original");
        assert!(
            outcome.is_exact(),
            "seed {seed}: unexpected {:?}, missed {:?}",
            outcome.unexpected,
            outcome.missed
        );
        assert_eq!(report.outcomes.len(), 120);
        if !session.mutation_log().is_empty() {
            assert!(report.failed() > 0, "seed {seed}: edits went unnoticed");
        }
        strategies.push(session.mutation_log().strategy);
    }
    assert!(strategies.contains(&Strategy::ComponentSwap));
    assert!(strategies.contains(&Strategy::ParameterChange));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn original_dataset_is_never_modified() {
    let dir = unique_temp_dir("untouched");
    let original = dir.join("ships.db");
    generate_database(&original, &small_fixture(), 2).expect("generate");
    let before = ShipStore::open_read_only(&original)
        .and_then(|store| store.snapshot())
        .expect("snapshot before");

    for seed in 0..6u64 {
        let config = DrydockConfig::default()
            .with_database(&original)
            .with_seed(seed);
        let session = TestSession::start(&config).expect("session should start");
        assert_ne!(
            session.randomized().snapshot().expect("clone snapshot"),
            before,
            "seed {seed}: clone should differ from the original"
        );
        let _ = session.run();
    }

    let after = ShipStore::open_read_only(&original)
        .and_then(|store| store.snapshot())
        .expect("snapshot after");
    assert_eq!(before, after);
    assert!(!dir.join("randomized_ship_database.db").exists());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn comparing_twice_gives_the_same_report() {
    let dir = unique_temp_dir("idempotent");
    let original = dir.join("ships.db");
    generate_database(&original, &small_fixture(), 8).expect("generate");
    let config = DrydockConfig::default()
        .with_database(&original)
        .with_seed(99);

    let session = TestSession::start(&config).expect("session should start");
    let first = session.run();
    let second = session.run();
    assert_eq!(first, second);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn swapped_weapon_fails_only_that_case() {
    let dir = unique_temp_dir("swap");
    let original_path = dir.join("ships.db");
    let clone_path = dir.join("clone.db");
    hand_built_fixture(&original_path);
    fs::copy(&original_path, &clone_path).expect("copy");

    let original = ShipStore::open_read_only(&original_path).expect("open original");
    let randomized = ShipStore::open(&clone_path).expect("open clone");
    assert!(randomized
        .set_ship_reference("Ship-1", ComponentKind::Weapon, "Weapon-7")
        .expect("update"));

    let cases = enumerate_cases(&original).expect("cases");
    let report = Comparator::new(&original, &randomized).check_all(&cases);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    let (case, failure) = failures[0];
    assert_eq!(case, &CheckCase::new("Ship-1", ComponentKind::Weapon));
    assert_eq!(
        failure,
        &CheckFailure::ReferenceMismatch {
            ship: "Ship-1".to_string(),
            kind: ComponentKind::Weapon,
            expected: "Weapon-3".to_string(),
            actual: "Weapon-7".to_string(),
        }
    );
    assert_eq!(
        failure.to_string(),
        "Ship-1, Weapon-7\nexpected Weapon-3, was Weapon-7"
    );
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn changed_diameter_fails_every_ship_carrying_the_weapon() {
    let dir = unique_temp_dir("diameter");
    let original_path = dir.join("ships.db");
    let clone_path = dir.join("clone.db");
    hand_built_fixture(&original_path);
    fs::copy(&original_path, &clone_path).expect("copy");

    let original = ShipStore::open_read_only(&original_path).expect("open original");
    let randomized = ShipStore::open(&clone_path).expect("open clone");
    assert!(randomized
        .set_component_field(ComponentKind::Weapon, "Weapon-5", Field::Diameter, 17)
        .expect("update"));

    let comparator = Comparator::new(&original, &randomized);
    for ship in ["Ship-2", "Ship-3"] {
        let failure = comparator
            .check(&CheckCase::new(ship, ComponentKind::Weapon))
            .expect_err("ship carrying Weapon-5 should fail");
        assert_eq!(
            failure.to_string(),
            format!("{ship}, Weapon-5\ndiameter: expected 10, was 17")
        );
    }
    for ship in ["Ship-1", "Ship-4"] {
        assert_eq!(
            comparator.check(&CheckCase::new(ship, ComponentKind::Weapon)),
            Ok(())
        );
    }
    for ship in ["Ship-1", "Ship-2", "Ship-3", "Ship-4"] {
        for kind in [ComponentKind::Hull, ComponentKind::Engine] {
            assert_eq!(comparator.check(&CheckCase::new(ship, kind)), Ok(()));
        }
    }
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn component_swap_never_touches_single_component_kinds() {
    let dir = unique_temp_dir("single");
    let original_path = dir.join("ships.db");
    let clone_path = dir.join("clone.db");
    hand_built_fixture(&original_path);

    for seed in 0..16u64 {
        fs::copy(&original_path, &clone_path).expect("copy");
        let randomized = ShipStore::open(&clone_path).expect("open clone");
        let mut randomizer = Randomizer::new(Rng::new(seed), Default::default());
        let mutations = randomizer
            .apply(Strategy::ComponentSwap, &randomized)
            .expect("swap");
        for edit in &mutations.edits {
            match edit {
                Edit::ReferenceSwap { kind, from, to, .. } => {
                    assert_eq!(*kind, ComponentKind::Weapon, "seed {seed}: {edit}");
                    assert_ne!(from, to);
                }
                Edit::FieldChange { .. } => panic!("component swap logged a field change"),
            }
        }
        drop(randomized);
        fs::remove_file(&clone_path).expect("remove clone");
    }
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn parameter_change_is_seen_through_every_reference() {
    let dir = unique_temp_dir("param");
    let original_path = dir.join("ships.db");
    let clone_path = dir.join("clone.db");
    hand_built_fixture(&original_path);
    fs::copy(&original_path, &clone_path).expect("copy");

    let original = ShipStore::open_read_only(&original_path).expect("open original");
    let randomized = ShipStore::open(&clone_path).expect("open clone");
    let mutations = Randomizer::new(Rng::new(5), Default::default())
        .apply(Strategy::ParameterChange, &randomized)
        .expect("parameter change");
    assert!(!mutations.is_empty());

    let cases = enumerate_cases(&original).expect("cases");
    let report = Comparator::new(&original, &randomized).check_all(&cases);
    let outcome = reconcile(&mutations, &original, &report).expect("reconcile");
    assert!(outcome.is_exact(), "{outcome:?}");
    // Hull-1 and Engine-1 back every ship, so their edits fail all four ships.
    let hull_failures = report
        .failures()
        .filter(|(case, _)| case.kind == ComponentKind::Hull)
        .count();
    assert_eq!(hull_failures, 4);
    let _ = fs::remove_dir_all(dir);
}
