//! Randomizer: applies exactly one mutation strategy to a dataset clone and logs every edit.

pub mod rng;
pub mod strategy;

pub use rng::Rng;
pub use strategy::{Edit, MutationLog, Strategy};

use crate::config::MutationLimits;
use crate::data::schema::{ComponentKind, ValueDomain};
use crate::data::store::{ShipStore, StoreError};

pub struct Randomizer {
    rng: Rng,
    limits: MutationLimits,
}

impl Randomizer {
    pub fn new(rng: Rng, limits: MutationLimits) -> Self {
        Self { rng, limits }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(Rng::new(seed), MutationLimits::default())
    }

    /// Pick a strategy with equal probability and apply it.
    pub fn randomize(&mut self, store: &ShipStore) -> Result<MutationLog, StoreError> {
        let strategy = if self.rng.coin() {
            Strategy::ComponentSwap
        } else {
            Strategy::ParameterChange
        };
        self.apply(strategy, store)
    }

    /// Apply one strategy. All edits land in a single transaction.
    pub fn apply(
        &mut self,
        strategy: Strategy,
        store: &ShipStore,
    ) -> Result<MutationLog, StoreError> {
        log::info!("applying randomization strategy: {strategy}");
        let tx = store.begin()?;
        let mut mutations = MutationLog::new(strategy);
        match strategy {
            Strategy::ComponentSwap => self.component_swap(store, &mut mutations)?,
            Strategy::ParameterChange => self.parameter_change(store, &mut mutations)?,
        }
        tx.commit()?;
        log::info!("{} edit(s) applied", mutations.len());
        Ok(mutations)
    }

    fn component_swap(
        &mut self,
        store: &ShipStore,
        mutations: &mut MutationLog,
    ) -> Result<(), StoreError> {
        let mut ids_by_kind: Vec<Vec<String>> = Vec::with_capacity(ComponentKind::ALL.len());
        for kind in ComponentKind::ALL {
            ids_by_kind.push(store.component_ids(kind)?);
        }

        for ship in store.ship_ids()? {
            let slot = self.rng.index(ComponentKind::ALL.len());
            let kind = ComponentKind::ALL[slot];
            let Some(current) = store.ship_reference(&ship, kind)? else {
                log::warn!("{ship} has no {kind} reference; left unchanged");
                continue;
            };

            let candidates: Vec<&String> =
                ids_by_kind[slot].iter().filter(|id| **id != current).collect();
            let Some(replacement) = self.rng.choose(&candidates).map(|id| (*id).clone()) else {
                log::debug!("{ship}.{kind}: no alternative to {current}");
                continue;
            };

            store.set_ship_reference(&ship, kind, &replacement)?;
            let edit = Edit::ReferenceSwap {
                ship,
                kind,
                from: current,
                to: replacement,
            };
            log::debug!("{edit}");
            mutations.edits.push(edit);
        }
        Ok(())
    }

    fn parameter_change(
        &mut self,
        store: &ShipStore,
        mutations: &mut MutationLog,
    ) -> Result<(), StoreError> {
        for kind in ComponentKind::ALL {
            let ids = store.component_ids(kind)?;
            if ids.is_empty() {
                continue;
            }
            let upper = self.limits.upper_bound(kind).min(ids.len()).max(1);
            let count = self.rng.range_inclusive(1, upper as i64) as usize;

            for index in self.rng.sample_indices(ids.len(), count) {
                let id = &ids[index];
                let fields = kind.fields();
                let field = fields[self.rng.index(fields.len())].field;
                let Some(current) = store.component(kind, id)?.and_then(|p| p.get(field)) else {
                    continue;
                };
                let Some(value) = fresh_value(&mut self.rng, self.limits.values, current) else {
                    log::debug!("{id}.{field}: no value other than {current} available");
                    continue;
                };

                store.set_component_field(kind, id, field, value)?;
                let edit = Edit::FieldChange {
                    kind,
                    component: id.clone(),
                    field,
                    from: current,
                    to: value,
                };
                log::debug!("{edit}");
                mutations.edits.push(edit);
            }
        }
        Ok(())
    }
}

/// Uniform value from `domain` other than `current`. None when the domain has no such value.
fn fresh_value(rng: &mut Rng, domain: ValueDomain, current: i64) -> Option<i64> {
    if domain.is_empty() {
        return None;
    }
    if !domain.contains(current) {
        return Some(rng.range_inclusive(domain.min, domain.max));
    }
    if domain.len() == 1 {
        return None;
    }
    let value = rng.range_inclusive(domain.min, domain.max - 1);
    Some(if value >= current { value + 1 } else { value })
}
