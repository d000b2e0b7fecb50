//! `pegada calc` plus the terminal/file output shared with `pegada quiz`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use tracing::info;

use pegada_core::report::{offset_lines, render_html, summary_text};
use pegada_core::{compute, render, CalculationRequest, EmissionReport, FactorTable, ReportFormat};

use crate::CalcArgs;

pub(crate) fn cmd_calc(args: &CalcArgs, factors: &FactorTable) -> Result<()> {
    let format = ReportFormat::parse(&args.format)?;
    let request = match &args.input {
        Some(path) => read_request(path)?,
        None => CalculationRequest {
            energia: args.energia,
            km: args.km,
            tipo: args.tipo.clone(),
            carne: args.carne,
            aviao: args.aviao,
            lixo: args.lixo,
        },
    };

    let answers = request.to_answers()?;
    let report = compute(&answers, factors)?;

    match format {
        ReportFormat::Structured => {
            let bytes = render(&report, format).into_bytes()?;
            match &args.out {
                Some(path) => {
                    fs::write(path, &bytes)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("{} {}", "wrote".green().bold(), path.display());
                }
                None => println!("{}", String::from_utf8_lossy(&bytes)),
            }
        }
        ReportFormat::Html => {
            print_report(&report);
            let path = write_html_report(&report, args.out.as_deref())?;
            println!("{} {}", "Relatório HTML:".cyan().bold(), path.display());
        }
    }
    Ok(())
}

fn read_request(path: &Path) -> Result<CalculationRequest> {
    let bytes = if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    Ok(CalculationRequest::from_slice(&bytes)?)
}

/// Writes the HTML report to `out`, or to a fresh temp file that outlives the process.
pub(crate) fn write_html_report(report: &EmissionReport, out: Option<&Path>) -> Result<PathBuf> {
    let html = render_html(report);
    let path = match out {
        Some(path) => {
            fs::write(path, html.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            path.to_path_buf()
        }
        None => {
            let mut file = tempfile::Builder::new()
                .prefix("pegada-relatorio-")
                .suffix(".html")
                .tempfile()
                .context("failed to create temp file for the HTML report")?;
            file.write_all(html.as_bytes())
                .context("failed to write the HTML report")?;
            file.flush()?;
            let (_, path) = file
                .keep()
                .map_err(|e| anyhow!("failed to persist HTML report: {e}"))?;
            path
        }
    };
    info!(path = %path.display(), "html report written");
    Ok(path)
}

pub(crate) fn print_report(report: &EmissionReport) {
    println!("{}", "Resultado".green().bold());
    for result in report.per_category() {
        println!(
            "  {:<14} {:>10.1} kg CO₂e  {:>5.1}%",
            result.category.label(),
            result.mass_kg,
            report.percent_of_total(result.category)
        );
    }
    println!(
        "  {:<14} {:>10.1} kg CO₂e  (modo de transporte: {})",
        "Total".bold(),
        report.total_mass_kg(),
        report.transport_mode()
    );
    println!();
    println!("{}", summary_text(report));

    let offsets = offset_lines(report);
    if !offsets.is_empty() {
        println!("{}", "Estimativa de custo de compensação:".bold());
        for line in offsets {
            println!("  {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegada_core::AnswerSet;
    use pegada_core::Category;

    fn args() -> CalcArgs {
        CalcArgs {
            energia: 100.0,
            km: 50.0,
            tipo: None,
            carne: 2.0,
            aviao: 0.0,
            lixo: 5.0,
            input: None,
            format: "json".to_string(),
            out: None,
        }
    }

    #[test]
    fn structured_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.json");
        let mut args = args();
        args.out = Some(out.clone());
        cmd_calc(&args, &FactorTable::default()).unwrap();

        let v: serde_json::Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
        assert_eq!(v["arvores"], 1);
        assert_eq!(v["total_toneladas"], 0.08);
    }

    #[test]
    fn html_output_to_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("relatorio.html");
        let mut args = args();
        args.format = "html".to_string();
        args.out = Some(out.clone());
        cmd_calc(&args, &FactorTable::default()).unwrap();

        let html = fs::read_to_string(&out).unwrap();
        assert!(html.contains("class=\"bar-rect\""));
    }

    #[test]
    fn request_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("req.json");
        fs::write(&input, r#"{ "energia": "100", "tipo": "moto", "km": 10 }"#).unwrap();
        let request = read_request(&input).unwrap();
        assert_eq!(request.energia, 100.0);
        assert_eq!(request.tipo.as_deref(), Some("moto"));
    }

    #[test]
    fn all_zero_is_an_error() {
        let args = CalcArgs {
            energia: 0.0,
            km: 0.0,
            carne: 0.0,
            lixo: 0.0,
            ..args()
        };
        let err = cmd_calc(&args, &FactorTable::default()).unwrap_err();
        assert!(err.to_string().contains("degenerate"));
    }

    #[test]
    fn unknown_format_is_an_error() {
        let mut args = args();
        args.format = "pdf".to_string();
        assert!(cmd_calc(&args, &FactorTable::default()).is_err());
    }

    #[test]
    fn temp_html_report_persists() {
        let answers = AnswerSet::new().with_value(Category::Waste, 10.0).unwrap();
        let report = compute(&answers, &FactorTable::default()).unwrap();
        let path = write_html_report(&report, None).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("html"));
        assert_eq!(fs::read_to_string(&path).unwrap(), render_html(&report));
        fs::remove_file(path).unwrap();
    }
}
