//! Fixture generation: create the four tables and fill them with random attribute values.

use std::path::Path;

use serde::Serialize;

use crate::config::FixtureConfig;
use crate::data::schema::{
    component_id, ship_id, ComponentKind, ComponentParams, ComponentRecord, ShipRecord,
};
use crate::data::store::{ShipStore, StoreError};
use crate::mutation::rng::Rng;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub path: String,
    pub seed: u64,
    pub weapons: usize,
    pub hulls: usize,
    pub engines: usize,
    pub ships: usize,
}

/// Create (or recreate) the dataset at `path`. Any existing file there is deleted first.
pub fn generate_database(
    path: impl AsRef<Path>,
    config: &FixtureConfig,
    seed: u64,
) -> Result<GenerationReport, StoreError> {
    let path = path.as_ref();
    let store = ShipStore::create(path)?;
    let mut rng = Rng::new(seed);
    let counts = populate(&store, config, &mut rng)?;
    log::info!(
        "database '{}' created and populated (seed {seed})",
        path.display()
    );
    Ok(GenerationReport {
        path: path.display().to_string(),
        seed,
        weapons: counts[0],
        hulls: counts[1],
        engines: counts[2],
        ships: counts[3],
    })
}

/// Populate an empty store. Returns inserted counts: weapons, hulls, engines, ships.
///
/// Ships are only inserted when every kind has at least one component, since each ship must
/// reference one of each.
pub fn populate(
    store: &ShipStore,
    config: &FixtureConfig,
    rng: &mut Rng,
) -> Result<[usize; 4], StoreError> {
    let tx = store.begin()?;
    let mut counts = [0usize; 4];
    let mut ids: Vec<Vec<String>> = Vec::with_capacity(ComponentKind::ALL.len());

    for (slot, kind) in ComponentKind::ALL.into_iter().enumerate() {
        let records = random_components(kind, config.population.of(kind), config, rng);
        for record in &records {
            store.insert_component(record)?;
        }
        log::debug!("inserted {} records into '{}'", records.len(), kind.table());
        counts[slot] = records.len();
        ids.push(records.into_iter().map(|record| record.id).collect());
    }

    if ids.iter().any(Vec::is_empty) {
        log::warn!("component ids missing for at least one kind; no ships inserted");
    } else {
        for index in 1..=config.population.ships {
            let ship = ShipRecord {
                id: ship_id(index),
                weapon: pick(rng, &ids[0]),
                hull: pick(rng, &ids[1]),
                engine: pick(rng, &ids[2]),
            };
            store.insert_ship(&ship)?;
        }
        counts[3] = config.population.ships;
        log::debug!("inserted {} records into 'ships'", counts[3]);
    }

    tx.commit()?;
    Ok(counts)
}

fn random_components(
    kind: ComponentKind,
    count: usize,
    config: &FixtureConfig,
    rng: &mut Rng,
) -> Vec<ComponentRecord> {
    (1..=count)
        .filter_map(|index| {
            let values: Vec<i64> = kind
                .fields()
                .iter()
                .map(|_| rng.range_inclusive(config.values.min, config.values.max))
                .collect();
            ComponentParams::from_values(kind, &values).map(|params| ComponentRecord {
                id: component_id(kind, index),
                params,
            })
        })
        .collect()
}

fn pick(rng: &mut Rng, ids: &[String]) -> String {
    rng.choose(ids).cloned().unwrap_or_default()
}
