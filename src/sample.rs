//! Synthetic well data for when no CSV is available.

use crate::types::{WellRecord, WellStatus};
use crate::util::round_to;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default weights for Producing, Shut-in, Abandoned, Drilling.
pub const DEFAULT_STATUS_WEIGHTS: [f64; 4] = [0.7, 0.18, 0.07, 0.05];

/// One oil field in the generator catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub production_factor: f64,
    pub well_count: u32,
}

impl FieldSpec {
    pub fn new(name: &str, production_factor: f64, well_count: u32) -> Self {
        Self {
            name: name.to_string(),
            production_factor,
            well_count,
        }
    }
}

pub fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("Paloch", 1.5, 24),
        FieldSpec::new("Adar Yale", 1.2, 16),
        FieldSpec::new("Melut Basin", 1.3, 18),
        FieldSpec::new("Muglad Basin", 1.1, 14),
        FieldSpec::new("Heglig", 1.0, 12),
        FieldSpec::new("Unity", 0.95, 10),
        FieldSpec::new("Thar Jath", 1.0, 8),
        FieldSpec::new("Bentiu", 0.9, 6),
        FieldSpec::new("Rubkona", 0.9, 6),
        FieldSpec::new("Toma South", 1.1, 8),
    ]
}

/// Draws well records from a weighted-random model.
pub struct SampleGenerator<'a> {
    fields: &'a [FieldSpec],
    statuses: Option<WeightedIndex<f64>>,
}

impl<'a> SampleGenerator<'a> {
    /// Invalid weights (wrong length, negative, all zero) fall back to
    /// [`DEFAULT_STATUS_WEIGHTS`].
    pub fn new(fields: &'a [FieldSpec], weights: &[f64]) -> Self {
        let custom = if weights.len() == WellStatus::GENERATED.len() {
            WeightedIndex::new(weights).ok()
        } else {
            None
        };
        let statuses = custom.or_else(|| {
            warn!(?weights, "Invalid status weights, using defaults");
            WeightedIndex::new(DEFAULT_STATUS_WEIGHTS).ok()
        });
        Self { fields, statuses }
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<WellRecord> {
        let capacity = self.fields.iter().map(|f| f.well_count as usize).sum();
        let mut wells = Vec::with_capacity(capacity);
        let mut id = 1u32;

        for field in self.fields {
            let prefix = field.name.split(' ').next().unwrap_or(&field.name);
            for _ in 0..field.well_count {
                let index = self.statuses.as_ref().map_or(0, |w| w.sample(rng));
                let status = WellStatus::GENERATED[index];
                let (production, change, water_cut) = match status {
                    WellStatus::Producing => (
                        (rng.gen_range(500.0..1500.0) * field.production_factor).round() as i64,
                        round_to(rng.gen_range(-5.0..5.0), 1),
                        round_to(rng.gen_range(10.0..35.0), 1),
                    ),
                    WellStatus::Drilling => (
                        (rng.gen_range(0.0..200.0) * field.production_factor).round() as i64,
                        0.0,
                        round_to(rng.gen_range(5.0..20.0), 1),
                    ),
                    _ => (0, 0.0, 0.0),
                };
                let name = format!(
                    "{} #{}-{}",
                    prefix,
                    rng.gen_range(100..=999),
                    rng.gen_range(100..=999)
                );
                wells.push(WellRecord {
                    id,
                    name,
                    field: field.name.clone(),
                    status,
                    production,
                    change,
                    water_cut,
                });
                id += 1;
            }
        }

        info!(wells = wells.len(), fields = self.fields.len(), "Generated sample well data");
        wells
    }
}
