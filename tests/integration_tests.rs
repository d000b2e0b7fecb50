//! Integration tests for the complete Pegada pipeline
//!
//! These tests verify end-to-end functionality across modules:
//! - Factor file → FactorTable
//! - Interview → AnswerSet → compute → render
//! - Request body → structured response
//!
//! Run with: cargo test --test integration_tests

use approx::assert_relative_eq;
use tempfile::tempdir;

use pegada_core::{
    compute, handle_calculation, render, Category, FactorTable, Interview, RenderedReport,
    ReportFormat, RequestError,
};

// ============================================================================
// Factor file → calculation
// ============================================================================

#[test]
fn test_shipped_factor_file_matches_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("factors.json");
    let from_file = FactorTable::from_path(&path);
    assert_eq!(from_file, FactorTable::default());
}

#[test]
fn test_factor_file_drives_calculation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("factors.json");
    std::fs::write(
        &path,
        r#"{
            "energia": { "descricao": "kg CO2e por kWh", "fator": 0.5 },
            "transporte": { "trem": 0.01, "carro": "rapido" },
            "carne": 10,
            "precos": { "Solar": 100 }
        }"#,
    )
    .unwrap();
    let factors = FactorTable::from_path(&path);

    // "carro" had a non-numeric factor and was dropped; "trem" is the only mode left.
    let body = br#"{ "energia": 100, "km": 1000, "tipo": "carro", "carne": 1 }"#;
    let response = handle_calculation(body, &factors).unwrap();
    assert_relative_eq!(response.total_kg, 50.0 + 10.0 + 10.0, epsilon = 1e-9);
    assert_eq!(response.modo_transporte, "trem");
    assert_eq!(response.compensacoes.len(), 1);
    assert_eq!(response.compensacoes["Solar"], 7.0);
}

#[test]
fn test_missing_factor_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let factors = FactorTable::from_path(dir.path().join("nao-existe.json"));
    assert_eq!(factors, FactorTable::default());
}

// ============================================================================
// Interview → compute → render
// ============================================================================

#[test]
fn test_interview_to_html_report() {
    let factors = FactorTable::default();
    let mut interview = Interview::new();
    interview.start();
    for raw in ["150", "80 moto", "1,5", "4", "7"] {
        interview.submit(raw).unwrap();
    }
    let answers = interview.into_result().unwrap();
    let report = compute(&answers, &factors).unwrap();

    assert_relative_eq!(report.mass_kg(Category::Energy), 150.0 * 12.0 * 0.084, epsilon = 1e-9);
    assert_relative_eq!(report.mass_kg(Category::Transport), 80.0 * 52.0 * 0.103, epsilon = 1e-9);
    assert_relative_eq!(report.mass_kg(Category::Diet), 1.5 * 52.0 * 27.0, epsilon = 1e-9);
    assert_relative_eq!(report.mass_kg(Category::Flight), 4.0 * 90.0, epsilon = 1e-9);
    assert_relative_eq!(report.mass_kg(Category::Waste), 7.0 * 52.0 * 1.9, epsilon = 1e-9);

    let sum: f64 = report.per_category().iter().map(|r| r.mass_kg).sum();
    assert_relative_eq!(report.total_mass_kg(), sum, epsilon = 1e-9);
    assert_eq!(
        report.tree_equivalent(),
        (report.tonnes() * 5.3).ceil() as u64
    );

    let html = match render(&report, ReportFormat::Html) {
        RenderedReport::Html(html) => html,
        other => panic!("expected html, got {other:?}"),
    };
    assert_eq!(html.matches("class=\"bar-rect\"").count(), 5);
    for category in Category::ALL {
        assert!(html.contains(category.label()));
    }

    let dir = tempdir().unwrap();
    let out = dir.path().join("relatorio.html");
    std::fs::write(&out, &html).unwrap();
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
}

#[test]
fn test_interview_reset_then_complete() {
    let mut interview = Interview::new();
    interview.start();
    interview.submit("10").unwrap();
    assert!(interview.submit("dez").is_err());
    interview.reset();
    assert!(interview.result().is_err());

    interview.start();
    for raw in ["0", "0", "0", "0", "0"] {
        interview.submit(raw).unwrap();
    }
    let answers = interview.result().unwrap();
    let err = compute(answers, &FactorTable::default()).unwrap_err();
    assert!(err.is_zero());
}

// ============================================================================
// Request-style interface
// ============================================================================

#[test]
fn test_reference_request() {
    let body = br#"{ "energia": 100, "km": 50, "tipo": "carro", "carne": 2, "aviao": 0, "lixo": 5 }"#;
    let response = handle_calculation(body, &FactorTable::default()).unwrap();

    assert_relative_eq!(response.total_kg, 81.5, epsilon = 1e-9);
    assert_eq!(response.total_toneladas, 0.08);
    assert_eq!(response.arvores, 1);
    assert_eq!(response.compensacoes["Reflorestamento"], 3.26);

    let json = serde_json::to_value(&response).unwrap();
    assert_relative_eq!(json["categorias"]["Energia"].as_f64().unwrap(), 8.4, epsilon = 1e-9);
    assert_eq!(json["detalhamento"][0]["categoria"], "Energia");
}

#[test]
fn test_request_unknown_mode_and_extra_keys() {
    let body = br#"{ "km": 100, "tipo": "teletransporte", "cor": "azul" }"#;
    let response = handle_calculation(body, &FactorTable::default()).unwrap();
    assert_eq!(response.modo_transporte, "carro");
    assert_relative_eq!(response.total_kg, 19.2, epsilon = 1e-9);
}

#[test]
fn test_request_errors() {
    let factors = FactorTable::default();
    assert!(matches!(
        handle_calculation(b"{ \"lixo\": \"-2\" }", &factors),
        Err(RequestError::InvalidValue(_))
    ));
    assert!(matches!(
        handle_calculation(b"\"texto\"", &factors),
        Err(RequestError::Malformed(_))
    ));
    assert!(matches!(
        handle_calculation(b"{ \"aviao\": 0 }", &factors),
        Err(RequestError::Degenerate(_))
    ));
}
