//! Emission factor configuration.
//!
//! The configuration document is JSON. Each scalar category may be given as a
//! descriptive object or as a bare number:
//!
//! ```json
//! {
//!   "energia": { "descricao": "Consumo de energia elétrica em kWh", "fator": 0.084 },
//!   "carne": 27.0,
//!   "transporte": { "carro": 0.192, "onibus": 0.089 },
//!   "precos": { "Reflorestamento": 40 }
//! }
//! ```
//!
//! Loading never fails. Anything absent or malformed is replaced by the
//! built-in default for that field and logged, so a [`FactorTable`] is always
//! fully populated.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::answers::Category;

pub const DEFAULT_ENERGY_FACTOR: f64 = 0.084;
pub const DEFAULT_DIET_FACTOR: f64 = 27.0;
pub const DEFAULT_FLIGHT_FACTOR: f64 = 90.0;
pub const DEFAULT_WASTE_FACTOR: f64 = 1.9;

/// Mode used when a transport answer names no mode or an unknown one.
pub const FALLBACK_TRANSPORT_MODE: &str = "carro";

const DEFAULT_TRANSPORT_FACTORS: [(&str, f64); 6] = [
    ("carro", 0.192),
    ("moto", 0.103),
    ("onibus", 0.089),
    ("metro", 0.041),
    ("bike", 0.0),
    ("caminhada", 0.0),
];

const DEFAULT_OFFSET_PRICES: [(&str, f64); 3] = [
    ("Reflorestamento", 40.0),
    ("Energia Renovável", 55.0),
    ("Captura e Armazenamento", 120.0),
];

/// Field holding the factor inside a descriptive category object.
const FACTOR_FIELD: &str = "fator";
const PRICES_KEY: &str = "precos";

/// Immutable, fully populated factor table.
///
/// Serializes to the flat configuration shape, so a serialized table loads
/// back to an equal table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorTable {
    #[serde(rename = "energia")]
    energy_factor: f64,
    #[serde(rename = "transporte")]
    transport_factors: BTreeMap<String, f64>,
    #[serde(rename = "carne")]
    diet_factor: f64,
    #[serde(rename = "aviao")]
    flight_factor: f64,
    #[serde(rename = "lixo")]
    waste_factor: f64,
    #[serde(rename = "precos")]
    offset_prices: BTreeMap<String, f64>,
}

impl Default for FactorTable {
    fn default() -> Self {
        Self {
            energy_factor: DEFAULT_ENERGY_FACTOR,
            transport_factors: default_transport_factors(),
            diet_factor: DEFAULT_DIET_FACTOR,
            flight_factor: DEFAULT_FLIGHT_FACTOR,
            waste_factor: DEFAULT_WASTE_FACTOR,
            offset_prices: default_offset_prices(),
        }
    }
}

impl FactorTable {
    /// Normalizes an optional configuration document.
    pub fn load(source: Option<&Value>) -> Self {
        let Some(doc) = source else {
            return Self::default();
        };
        let Some(doc) = doc.as_object() else {
            warn!("factor document is not a JSON object; using built-in defaults");
            return Self::default();
        };

        Self {
            energy_factor: scalar_factor(doc, Category::Energy, DEFAULT_ENERGY_FACTOR),
            transport_factors: transport_factors(doc.get(Category::Transport.config_key())),
            diet_factor: scalar_factor(doc, Category::Diet, DEFAULT_DIET_FACTOR),
            flight_factor: scalar_factor(doc, Category::Flight, DEFAULT_FLIGHT_FACTOR),
            waste_factor: scalar_factor(doc, Category::Waste, DEFAULT_WASTE_FACTOR),
            offset_prices: offset_prices(doc.get(PRICES_KEY)),
        }
    }

    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(doc) => Self::load(Some(&doc)),
            Err(err) => {
                warn!(error = %err, "factor document is not valid JSON; using built-in defaults");
                Self::default()
            }
        }
    }

    /// Reads a factor file. A missing or unreadable file yields the defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "loading factor file");
                Self::from_json_str(&text)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no factor file; using built-in defaults");
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read factor file; using built-in defaults"
                );
                Self::default()
            }
        }
    }

    pub fn energy_factor(&self) -> f64 {
        self.energy_factor
    }

    pub fn diet_factor(&self) -> f64 {
        self.diet_factor
    }

    pub fn flight_factor(&self) -> f64 {
        self.flight_factor
    }

    pub fn waste_factor(&self) -> f64 {
        self.waste_factor
    }

    pub fn transport_factors(&self) -> &BTreeMap<String, f64> {
        &self.transport_factors
    }

    pub fn offset_prices(&self) -> &BTreeMap<String, f64> {
        &self.offset_prices
    }

    /// Factor for `category`; transport uses the mode resolved from `mode`.
    pub fn factor(&self, category: Category, mode: Option<&str>) -> f64 {
        match category {
            Category::Energy => self.energy_factor,
            Category::Transport => self.transport_factor(mode).1,
            Category::Diet => self.diet_factor,
            Category::Flight => self.flight_factor,
            Category::Waste => self.waste_factor,
        }
    }

    /// Resolves a transport mode to a configured `(mode, factor)` pair.
    ///
    /// Matching is exact first, then case-insensitive. Unknown or absent
    /// modes resolve to [`FactorTable::fallback_transport`].
    pub fn transport_factor(&self, mode: Option<&str>) -> (&str, f64) {
        if let Some(wanted) = mode.map(str::trim).filter(|m| !m.is_empty()) {
            if let Some((name, factor)) = self.transport_factors.get_key_value(wanted) {
                return (name.as_str(), *factor);
            }
            if let Some((name, factor)) = self
                .transport_factors
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            {
                return (name.as_str(), *factor);
            }
            debug!(mode = wanted, "unknown transport mode; using fallback");
        }
        self.fallback_transport()
    }

    pub fn resolve_transport_mode(&self, mode: Option<&str>) -> &str {
        self.transport_factor(mode).0
    }

    /// `carro` when configured, else the first mode in key order.
    pub fn fallback_transport(&self) -> (&str, f64) {
        if let Some((name, factor)) = self.transport_factors.get_key_value(FALLBACK_TRANSPORT_MODE) {
            return (name.as_str(), *factor);
        }
        match self.transport_factors.iter().next() {
            Some((name, factor)) => (name.as_str(), *factor),
            // Tables built by `load` always hold at least one mode.
            None => (FALLBACK_TRANSPORT_MODE, DEFAULT_TRANSPORT_FACTORS[0].1),
        }
    }
}

fn default_transport_factors() -> BTreeMap<String, f64> {
    DEFAULT_TRANSPORT_FACTORS
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}

fn default_offset_prices() -> BTreeMap<String, f64> {
    DEFAULT_OFFSET_PRICES
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}

fn is_valid_factor(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn scalar_factor(doc: &Map<String, Value>, category: Category, default: f64) -> f64 {
    let key = category.config_key();
    let raw = match doc.get(key) {
        None => {
            debug!(key, default, "factor absent; using default");
            return default;
        }
        Some(Value::Object(described)) => described.get(FACTOR_FIELD),
        Some(bare) => Some(bare),
    };

    match raw.and_then(Value::as_f64) {
        Some(v) if is_valid_factor(v) => v,
        _ => {
            warn!(key, default, "malformed factor; using default");
            default
        }
    }
}

/// Keeps the well-formed entries of a `name → number` mapping.
fn numeric_entries(key: &str, entries: &Map<String, Value>) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (name, value) in entries {
        let name = name.trim();
        match value.as_f64() {
            Some(v) if is_valid_factor(v) && !name.is_empty() => {
                out.insert(name.to_string(), v);
            }
            _ => warn!(key, entry = name, "dropping malformed entry"),
        }
    }
    out
}

fn transport_factors(value: Option<&Value>) -> BTreeMap<String, f64> {
    let key = Category::Transport.config_key();
    let parsed = match value {
        None => BTreeMap::new(),
        Some(Value::Object(modes)) => numeric_entries(key, modes),
        Some(bare) => match bare.as_f64() {
            Some(v) if is_valid_factor(v) => {
                BTreeMap::from([(FALLBACK_TRANSPORT_MODE.to_string(), v)])
            }
            _ => BTreeMap::new(),
        },
    };

    if parsed.is_empty() {
        if value.is_some() {
            warn!(key, "no usable transport factors; using defaults");
        }
        return default_transport_factors();
    }
    parsed
}

fn offset_prices(value: Option<&Value>) -> BTreeMap<String, f64> {
    let parsed = match value {
        Some(Value::Object(prices)) => numeric_entries(PRICES_KEY, prices),
        _ => BTreeMap::new(),
    };

    if parsed.is_empty() {
        if value.is_some() {
            warn!(key = PRICES_KEY, "no usable offset prices; using defaults");
        }
        return default_offset_prices();
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_fully_populated(table: &FactorTable) {
        for f in [
            table.energy_factor(),
            table.diet_factor(),
            table.flight_factor(),
            table.waste_factor(),
        ] {
            assert!(f.is_finite() && f >= 0.0);
        }
        assert!(!table.transport_factors().is_empty());
        assert!(!table.offset_prices().is_empty());
        assert!(table
            .transport_factors()
            .iter()
            .all(|(k, v)| !k.is_empty() && v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn none_and_empty_documents_give_defaults() {
        assert_eq!(FactorTable::load(None), FactorTable::default());
        assert_eq!(FactorTable::load(Some(&json!({}))), FactorTable::default());
        assert_eq!(FactorTable::load(Some(&json!([1, 2]))), FactorTable::default());
    }

    #[test]
    fn described_and_bare_shapes_are_equivalent() {
        let described = FactorTable::load(Some(&json!({
            "energia": { "descricao": "kWh", "fator": 0.1 },
            "carne": { "descricao": "kg", "fator": 20 },
        })));
        let bare = FactorTable::load(Some(&json!({ "energia": 0.1, "carne": 20 })));
        assert_eq!(described, bare);
        assert_eq!(bare.energy_factor(), 0.1);
        assert_eq!(bare.diet_factor(), 20.0);
        assert_eq!(bare.flight_factor(), DEFAULT_FLIGHT_FACTOR);
    }

    #[test]
    fn wrong_types_fall_back_per_field() {
        let table = FactorTable::load(Some(&json!({
            "energia": "lots",
            "aviao": { "descricao": "h", "fator": "x" },
            "lixo": -3.0,
            "carne": { "descricao": "sem fator" },
            "transporte": [],
            "precos": 12,
        })));
        assert_eq!(table, FactorTable::default());
        assert_fully_populated(&table);
    }

    #[test]
    fn mappings_drop_bad_entries_and_keep_good_ones() {
        let table = FactorTable::load(Some(&json!({
            "transporte": { "carro": 0.2, "foguete": "rápido", "": 1.0, "trem": -1 },
            "precos": { "Reflorestamento": 40, "Grátis": null },
        })));
        assert_eq!(table.transport_factors().len(), 1);
        assert_eq!(table.transport_factors()["carro"], 0.2);
        assert_eq!(table.offset_prices().len(), 1);
        assert_eq!(table.offset_prices()["Reflorestamento"], 40.0);
    }

    #[test]
    fn empty_mappings_are_replaced_wholesale() {
        let table = FactorTable::load(Some(&json!({ "transporte": {}, "precos": {} })));
        assert_eq!(table.transport_factors(), &default_transport_factors());
        assert_eq!(table.offset_prices(), &default_offset_prices());
    }

    #[test]
    fn bare_transport_number_becomes_fallback_mode() {
        let table = FactorTable::load(Some(&json!({ "transporte": 0.15 })));
        assert_eq!(table.transport_factor(None), ("carro", 0.15));
    }

    #[test]
    fn transport_resolution_falls_back() {
        let table = FactorTable::default();
        assert_eq!(table.transport_factor(Some("onibus")), ("onibus", 0.089));
        assert_eq!(table.transport_factor(Some("ONIBUS")), ("onibus", 0.089));
        assert_eq!(table.transport_factor(Some("teleporte")), ("carro", 0.192));
        assert_eq!(table.transport_factor(None), ("carro", 0.192));

        let no_car = FactorTable::load(Some(&json!({ "transporte": { "trem": 0.03, "bike": 0.0 } })));
        assert_eq!(no_car.resolve_transport_mode(Some("carro")), "bike");
    }

    #[test]
    fn serialized_table_loads_back_equal() {
        let table = FactorTable::load(Some(&json!({
            "energia": 0.5,
            "transporte": { "metro": 0.04 },
            "precos": { "Solar": 10.5 },
        })));
        let doc = serde_json::to_value(&table).unwrap();
        assert_eq!(FactorTable::load(Some(&doc)), table);
    }

    #[test]
    fn invalid_json_text_gives_defaults() {
        assert_eq!(FactorTable::from_json_str("{ not json"), FactorTable::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let table = FactorTable::from_path(dir.path().join("nope.json"));
        assert_eq!(table, FactorTable::default());
    }

    #[test]
    fn factor_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factors.json");
        fs::write(&path, r#"{ "aviao": { "descricao": "h", "fator": 100 } }"#).unwrap();
        assert_eq!(FactorTable::from_path(&path).flight_factor(), 100.0);
    }
}
