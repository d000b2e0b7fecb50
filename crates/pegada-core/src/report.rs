//! Report rendering.
//!
//! A formatting layer over a finished [`EmissionReport`]; nothing here
//! recomputes masses.
//!
//! Output formats:
//! - Structured (JSON): the body returned by the request interface
//! - HTML: self-contained bar chart + table, no external assets

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::answers::Category;
use crate::calculator::EmissionReport;

/// Height of a bar holding 100% of the total.
pub const MAX_CHART_HEIGHT_PX: f64 = 260.0;

const CURRENCY: &str = "R$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Structured,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown report format `{0}` (expected json|html)")]
pub struct UnknownReportFormat(pub String);

impl ReportFormat {
    pub fn parse(s: &str) -> Result<Self, UnknownReportFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "structured" => Ok(Self::Structured),
            "html" | "htm" => Ok(Self::Html),
            other => Err(UnknownReportFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub categoria: String,
    pub kg: f64,
    pub percentual: f64,
}

/// Plain data projection of an [`EmissionReport`].
///
/// `total_toneladas` and `compensacoes` are rounded to two decimals;
/// `toneladas` keeps full precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredReport {
    pub total_kg: f64,
    pub toneladas: f64,
    pub total_toneladas: f64,
    pub arvores: u64,
    /// Category label → kg CO2e.
    pub categorias: BTreeMap<String, f64>,
    /// Same masses in fixed category order, with their share of the total.
    pub detalhamento: Vec<CategoryShare>,
    pub compensacoes: BTreeMap<String, f64>,
    pub modo_transporte: String,
    pub resumo: String,
}

impl StructuredReport {
    pub fn from_report(report: &EmissionReport) -> Self {
        let detalhamento: Vec<CategoryShare> = report
            .per_category()
            .iter()
            .map(|r| CategoryShare {
                categoria: r.category.label().to_string(),
                kg: r.mass_kg,
                percentual: report.percent_of_total(r.category),
            })
            .collect();

        Self {
            total_kg: report.total_mass_kg(),
            toneladas: report.tonnes(),
            total_toneladas: round_to(report.tonnes(), 2),
            arvores: report.tree_equivalent(),
            categorias: detalhamento
                .iter()
                .map(|s| (s.categoria.clone(), s.kg))
                .collect(),
            detalhamento,
            compensacoes: report
                .offset_costs()
                .iter()
                .map(|(name, cost)| (name.clone(), round_to(*cost, 2)))
                .collect(),
            modo_transporte: report.transport_mode().to_string(),
            resumo: summary_text(report),
        }
    }
}

/// One chart bar. The same `color` is used for the table swatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub category: Category,
    pub label: &'static str,
    pub color: &'static str,
    pub height_px: u32,
    pub mass_kg: f64,
    pub percent: f64,
}

/// Bars for the five categories, heights proportional to their share.
pub fn chart_bars(report: &EmissionReport) -> Vec<ChartBar> {
    let total = report.total_mass_kg();
    report
        .per_category()
        .iter()
        .map(|r| {
            let share = r.mass_kg / total;
            ChartBar {
                category: r.category,
                label: r.category.label(),
                color: r.category.color(),
                height_px: (share * MAX_CHART_HEIGHT_PX).round() as u32,
                mass_kg: r.mass_kg,
                percent: share * 100.0,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedReport {
    Structured(StructuredReport),
    Html(String),
}

impl RenderedReport {
    pub fn content_type(&self) -> &'static str {
        match self {
            RenderedReport::Structured(_) => "application/json",
            RenderedReport::Html(_) => "text/html; charset=utf-8",
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            RenderedReport::Structured(s) => serde_json::to_vec_pretty(&s),
            RenderedReport::Html(html) => Ok(html.into_bytes()),
        }
    }
}

pub fn render(report: &EmissionReport, format: ReportFormat) -> RenderedReport {
    match format {
        ReportFormat::Structured => RenderedReport::Structured(StructuredReport::from_report(report)),
        ReportFormat::Html => RenderedReport::Html(render_html(report)),
    }
}

pub fn summary_text(report: &EmissionReport) -> String {
    format!(
        "Você emitiu aproximadamente {:.3} toneladas de CO₂e por ano. Isto equivale a plantar ~{} árvores.",
        report.tonnes(),
        report.tree_equivalent()
    )
}

/// Offset cost lines, e.g. `Reflorestamento: R$ 3.26`.
pub fn offset_lines(report: &EmissionReport) -> Vec<String> {
    report
        .offset_costs()
        .iter()
        .map(|(name, cost)| format!("{name}: {CURRENCY} {cost:.2}"))
        .collect()
}

pub fn render_html(report: &EmissionReport) -> String {
    use html_escape::{encode_double_quoted_attribute, encode_text};

    let bars = chart_bars(report);

    let mut bar_html = String::new();
    let mut row_html = String::new();
    for bar in &bars {
        bar_html.push_str(&format!(
            "<div class=\"bar\"><div class=\"bar-rect\" style=\"background:{color}; height:{h}px;\" title=\"{title}\"></div><div class=\"bar-label\">{label}</div></div>\n",
            color = bar.color,
            h = bar.height_px,
            title = encode_double_quoted_attribute(&format!("{}: {:.1} kg CO₂e", bar.label, bar.mass_kg)),
            label = encode_text(bar.label),
        ));
        row_html.push_str(&format!(
            "<tr><td><span class=\"swatch\" style=\"background:{color};\"></span></td><td>{label}</td><td>{kg:.1}</td><td>{pct:.1}%</td></tr>\n",
            color = bar.color,
            label = encode_text(bar.label),
            kg = bar.mass_kg,
            pct = bar.percent,
        ));
    }

    let total = format!(
        "{:.2} kg CO₂e = {:.3} tCO₂e",
        report.total_mass_kg(),
        report.tonnes()
    );

    let offsets = if report.offset_costs().is_empty() {
        String::new()
    } else {
        let items: String = offset_lines(report)
            .iter()
            .map(|line| format!("<li>{}</li>", encode_text(line)))
            .collect();
        format!("<p><strong>Estimativa de custo de compensação:</strong></p>\n<ul>{items}</ul>")
    };

    // Configured text (offset names) goes in last so it is never re-scanned
    // for placeholders.
    let template = include_str!("../templates/report.html");
    template
        .replace("{{CHART_HEIGHT}}", &(MAX_CHART_HEIGHT_PX as u32 + 60).to_string())
        .replace("{{BARS}}", &bar_html)
        .replace("{{ROWS}}", &row_html)
        .replace("{{TOTAL}}", &total)
        .replace("{{SUMMARY}}", &encode_text(&summary_text(report)))
        .replace("{{OFFSETS}}", &offsets)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
