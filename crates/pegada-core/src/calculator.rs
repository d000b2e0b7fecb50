//! Emission calculator: answers + factors → [`EmissionReport`].
//!
//! Pure and deterministic. Both entry points (HTTP requests and interviews)
//! compute through [`compute`].

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::answers::{AnswerSet, Category};
use crate::factors::FactorTable;

pub const KG_PER_TONNE: f64 = 1000.0;

/// Trees needed to offset one tonne of CO2e.
pub const TREES_PER_TONNE: f64 = 5.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryResult {
    pub category: Category,
    pub mass_kg: f64,
}

/// The computed total was zero, negative or non-finite, or a figure derived
/// from it (tree equivalent, an offset cost) is not representable.
///
/// The engine does not decide whether this is a legitimate zero footprint or
/// a sign the inputs should be collected again.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("degenerate emission total: {total_mass_kg} kg CO2e")]
pub struct DegenerateResult {
    pub total_mass_kg: f64,
}

impl DegenerateResult {
    /// True for an exact zero total (no emitting activity answered).
    pub fn is_zero(&self) -> bool {
        self.total_mass_kg == 0.0
    }
}

/// Categorized result. Only [`compute`] builds one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionReport {
    per_category: Vec<CategoryResult>,
    total_mass_kg: f64,
    tonnes: f64,
    tree_equivalent: u64,
    offset_costs: BTreeMap<String, f64>,
    transport_mode: String,
}

impl EmissionReport {
    /// All five categories, in [`Category::ALL`] order.
    pub fn per_category(&self) -> &[CategoryResult] {
        &self.per_category
    }

    pub fn mass_kg(&self, category: Category) -> f64 {
        self.per_category[category.index()].mass_kg
    }

    pub fn total_mass_kg(&self) -> f64 {
        self.total_mass_kg
    }

    pub fn tonnes(&self) -> f64 {
        self.tonnes
    }

    pub fn tree_equivalent(&self) -> u64 {
        self.tree_equivalent
    }

    pub fn offset_costs(&self) -> &BTreeMap<String, f64> {
        &self.offset_costs
    }

    /// Transport mode whose factor was applied.
    pub fn transport_mode(&self) -> &str {
        &self.transport_mode
    }

    /// Share of the total for `category`, in percent.
    pub fn percent_of_total(&self, category: Category) -> f64 {
        self.mass_kg(category) / self.total_mass_kg * 100.0
    }
}

pub fn compute(answers: &AnswerSet, factors: &FactorTable) -> Result<EmissionReport, DegenerateResult> {
    let (transport_mode, transport_factor) = factors.transport_factor(answers.transport_mode());

    let per_category: Vec<CategoryResult> = Category::ALL
        .iter()
        .map(|&category| {
            let factor = match category {
                Category::Transport => transport_factor,
                other => factors.factor(other, None),
            };
            CategoryResult {
                category,
                mass_kg: answers.value(category) * factor,
            }
        })
        .collect();

    let total_mass_kg: f64 = per_category.iter().map(|r| r.mass_kg).sum();
    if !total_mass_kg.is_finite() || total_mass_kg <= 0.0 {
        return Err(DegenerateResult { total_mass_kg });
    }

    let degenerate = DegenerateResult { total_mass_kg };

    let tonnes = total_mass_kg / KG_PER_TONNE;
    let trees = (tonnes * TREES_PER_TONNE).ceil();
    // 2^64 as f64; anything at or above it would saturate the cast.
    if !trees.is_finite() || trees >= u64::MAX as f64 {
        warn!(total_mass_kg, trees, "tree equivalent out of range");
        return Err(degenerate);
    }
    let tree_equivalent = trees as u64;

    let mut offset_costs = BTreeMap::new();
    for (name, price) in factors.offset_prices() {
        let cost = tonnes * price;
        if !cost.is_finite() {
            warn!(total_mass_kg, program = %name, price, "offset cost overflowed");
            return Err(degenerate);
        }
        offset_costs.insert(name.clone(), cost);
    }

    Ok(EmissionReport {
        per_category,
        total_mass_kg,
        tonnes,
        tree_equivalent,
        offset_costs,
        transport_mode: transport_mode.to_string(),
    })
}
