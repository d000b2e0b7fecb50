//! Answer model shared by the interview, the request layer and the calculator.
//!
//! An [`AnswerSet`] maps each [`Category`] to at most one [`RawAnswer`]. Values
//! are validated on construction (finite, non-negative); an `AnswerSet` may be
//! partial, and missing categories count as zero when computed.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Emission categories, in the fixed order used by interviews and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Energy,
    Transport,
    Diet,
    Flight,
    Waste,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Energy,
        Category::Transport,
        Category::Diet,
        Category::Flight,
        Category::Waste,
    ];

    /// Display label used in reports and charts.
    pub fn label(self) -> &'static str {
        match self {
            Category::Energy => "Energia",
            Category::Transport => "Transporte",
            Category::Diet => "Alimentação",
            Category::Flight => "Viagens",
            Category::Waste => "Resíduos",
        }
    }

    /// Key of this category in the factor configuration document.
    pub fn config_key(self) -> &'static str {
        match self {
            Category::Energy => "energia",
            Category::Transport => "transporte",
            Category::Diet => "carne",
            Category::Flight => "aviao",
            Category::Waste => "lixo",
        }
    }

    /// Chart/table color. Bars and table swatches must use the same value.
    pub fn color(self) -> &'static str {
        match self {
            Category::Energy => "#4e79a7",
            Category::Transport => "#f28e2b",
            Category::Diet => "#e15759",
            Category::Flight => "#76b7b2",
            Category::Waste => "#59a14f",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    NotANumber,
    Negative,
    NotFinite,
    UnexpectedToken,
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ValidationReason::NotANumber => "not a number",
            ValidationReason::Negative => "must not be negative",
            ValidationReason::NotFinite => "must be finite",
            ValidationReason::UnexpectedToken => "unexpected extra input",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{category} answer {value} rejected: {reason}")]
pub struct InvalidAnswer {
    pub category: Category,
    pub value: f64,
    pub reason: ValidationReason,
}

/// One validated answer. `mode` is only meaningful for [`Category::Transport`].
///
/// Only [`RawAnswer::new`] builds one, so the value is always finite and
/// non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawAnswer {
    category: Category,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
}

impl RawAnswer {
    pub fn new(category: Category, value: f64) -> Result<Self, InvalidAnswer> {
        let reason = if !value.is_finite() {
            Some(ValidationReason::NotFinite)
        } else if value < 0.0 {
            Some(ValidationReason::Negative)
        } else {
            None
        };
        match reason {
            Some(reason) => Err(InvalidAnswer {
                category,
                value,
                reason,
            }),
            None => Ok(Self {
                category,
                value,
                mode: None,
            }),
        }
    }

    pub fn with_mode(mut self, mode: Option<&str>) -> Self {
        self.mode = mode
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }
}

/// Category → answer map, keyed by each answer's own category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnswerSet {
    answers: BTreeMap<Category, RawAnswer>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `answer`, replacing any previous answer for the same category.
    pub fn insert(&mut self, answer: RawAnswer) {
        self.answers.insert(answer.category, answer);
    }

    /// Builder-style insert of a validated value.
    pub fn with_value(mut self, category: Category, value: f64) -> Result<Self, InvalidAnswer> {
        self.insert(RawAnswer::new(category, value)?);
        Ok(self)
    }

    pub fn with_transport(mut self, km: f64, mode: Option<&str>) -> Result<Self, InvalidAnswer> {
        self.insert(RawAnswer::new(Category::Transport, km)?.with_mode(mode));
        Ok(self)
    }

    pub fn get(&self, category: Category) -> Option<&RawAnswer> {
        self.answers.get(&category)
    }

    /// Answer value, or `0.0` when the category was not answered.
    pub fn value(&self, category: Category) -> f64 {
        self.answers.get(&category).map_or(0.0, RawAnswer::value)
    }

    pub fn transport_mode(&self) -> Option<&str> {
        self.get(Category::Transport).and_then(RawAnswer::mode)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// True once every category has an answer.
    pub fn is_complete(&self) -> bool {
        Category::ALL.iter().all(|c| self.answers.contains_key(c))
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }
}

/// Parses a user-typed quantity.
///
/// Blank input is `0`; a lone decimal comma (`2,5`) is read as a decimal point.
/// Sign and finiteness are not checked here.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    if s.contains(',') && !s.contains('.') && s.matches(',').count() == 1 {
        return s.replace(',', ".").parse().ok();
    }
    s.parse().ok()
}
