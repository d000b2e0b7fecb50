//! Request-style interface: the flat JSON payload accepted by `POST /calcular`.
//!
//! ```json
//! { "energia": 100, "km": "50", "tipo": "onibus", "carne": 2, "aviao": 0, "lixo": 5 }
//! ```
//!
//! Every key is optional (absent → `0`, `tipo` → fallback mode) and unknown keys
//! are ignored. Values are taken as already-annual quantities.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::answers::{parse_quantity, AnswerSet, Category, InvalidAnswer, RawAnswer};
use crate::calculator::{compute, DegenerateResult};
use crate::factors::FactorTable;
use crate::report::StructuredReport;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request body: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidValue(#[from] InvalidAnswer),
    #[error(transparent)]
    Degenerate(#[from] DegenerateResult),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    #[serde(default, deserialize_with = "lenient_number")]
    pub energia: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub km: f64,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub carne: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub aviao: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lixo: f64,
}

/// Accepts numbers, numeric strings and `null` (as `0`).
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom(format!("number out of range: {n}"))),
        Value::String(s) => parse_quantity(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("not a number: `{s}`"))),
        other => Err(serde::de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

impl CalculationRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Validates every value; all five categories are present in the result.
    pub fn to_answers(&self) -> Result<AnswerSet, RequestError> {
        let mut answers = AnswerSet::new();
        answers.insert(RawAnswer::new(Category::Energy, self.energia)?);
        answers.insert(RawAnswer::new(Category::Transport, self.km)?.with_mode(self.tipo.as_deref()));
        answers.insert(RawAnswer::new(Category::Diet, self.carne)?);
        answers.insert(RawAnswer::new(Category::Flight, self.aviao)?);
        answers.insert(RawAnswer::new(Category::Waste, self.lixo)?);
        Ok(answers)
    }
}

/// Request body → structured response, the whole request-handler contract.
pub fn handle_calculation(body: &[u8], factors: &FactorTable) -> Result<StructuredReport, RequestError> {
    let request = CalculationRequest::from_slice(body)?;
    let answers = request.to_answers()?;
    let report = compute(&answers, factors)?;
    Ok(StructuredReport::from_report(&report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn absent_keys_default_to_zero_and_car() {
        let req = CalculationRequest::from_slice(br#"{ "carne": 1, "outro": true }"#).unwrap();
        assert_eq!(req.energia, 0.0);
        assert_eq!(req.tipo, None);
        let answers = req.to_answers().unwrap();
        assert!(answers.is_complete());
        assert_eq!(answers.value(Category::Diet), 1.0);
    }

    #[test]
    fn numeric_strings_and_nulls_are_accepted() {
        let req =
            CalculationRequest::from_slice(br#"{ "energia": "100", "km": "2,5", "lixo": null }"#)
                .unwrap();
        assert_eq!(req.energia, 100.0);
        assert_eq!(req.km, 2.5);
        assert_eq!(req.lixo, 0.0);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            CalculationRequest::from_slice(br#"{ "energia": "muito" }"#),
            Err(RequestError::Malformed(_))
        ));
        assert!(matches!(
            CalculationRequest::from_slice(br#"{ "energia": [1] }"#),
            Err(RequestError::Malformed(_))
        ));
        let negative = CalculationRequest::from_slice(br#"{ "km": -4 }"#).unwrap();
        assert!(matches!(negative.to_answers(), Err(RequestError::InvalidValue(_))));
        let nan = CalculationRequest::from_slice(br#"{ "km": "NaN" }"#).unwrap();
        assert!(matches!(nan.to_answers(), Err(RequestError::InvalidValue(_))));
    }

    #[test]
    fn handle_calculation_reference_body() {
        let body = br#"{ "energia": 100, "km": 50, "tipo": "carro", "carne": 2, "aviao": 0, "lixo": 5 }"#;
        let resp = handle_calculation(body, &FactorTable::default()).unwrap();
        assert_relative_eq!(resp.total_kg, 81.5, epsilon = 1e-9);
        assert_eq!(resp.total_toneladas, 0.08);
        assert_eq!(resp.arvores, 1);
        assert_eq!(resp.compensacoes["Reflorestamento"], 3.26);
        assert_eq!(resp.modo_transporte, "carro");
    }

    #[test]
    fn empty_body_is_degenerate() {
        let err = handle_calculation(b"{}", &FactorTable::default()).unwrap_err();
        assert!(matches!(err, RequestError::Degenerate(d) if d.is_zero()));
    }
}
