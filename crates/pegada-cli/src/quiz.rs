//! Terminal front end for the interview.
//!
//! By default we use `rustyline` for line editing and history.
//! A minimal stdin-based fallback exists behind `--no-default-features`.
//!
//! Every line is either a command (`ajuda`, `reiniciar`, `sair`) or the
//! answer to the current question.

use std::fs;
use std::io::{self, Read};
#[cfg(not(feature = "repl-rustyline"))]
use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use colored::Colorize;
use tracing::debug;

use pegada_core::{compute, Advance, EmissionReport, FactorTable, Interview, Question};

use crate::calc::{print_report, write_html_report};
use crate::QuizArgs;

const PROMPT: &str = "pegada> ";

pub(crate) fn cmd_quiz(args: &QuizArgs, factors: &FactorTable) -> Result<()> {
    #[cfg(feature = "repl-rustyline")]
    {
        cmd_quiz_rustyline(args, factors)
    }
    #[cfg(not(feature = "repl-rustyline"))]
    {
        cmd_quiz_simple(args, factors)
    }
}

pub(crate) fn cmd_quiz_script(args: &QuizArgs, factors: &FactorTable) -> Result<()> {
    let mut session = QuizSession::new(factors, args.html_out.clone());
    session.begin(!args.quiet);

    let mut lines: Vec<String> = Vec::new();
    if let Some(script_path) = &args.script {
        let text = if script_path.as_os_str() == "-" {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            fs::read_to_string(script_path)?
        };
        lines.extend(text.lines().map(str::to_string));
    }
    lines.extend(args.answers.iter().cloned());

    for (idx, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        if line.starts_with('#') {
            continue;
        }
        if !args.quiet {
            println!("{PROMPT}{line}");
        }

        match dispatch_quiz_line(&mut session, line) {
            Ok(QuizControl::Continue) => {
                if !args.quiet {
                    session.show_current_question();
                }
            }
            Ok(QuizControl::Exit) => break,
            Err(e) => {
                if args.continue_on_error {
                    eprintln!("{} {e}", "error:".red().bold());
                } else {
                    return Err(anyhow!("quiz script failed at line {}: {e}", idx + 1));
                }
            }
        }
    }

    if session.last_report.is_none() {
        let (answered, total) = session.interview.progress();
        return Err(anyhow!(
            "quiz script ended before the interview was complete ({answered} of {total} answered)"
        ));
    }
    Ok(())
}

#[cfg(not(feature = "repl-rustyline"))]
fn cmd_quiz_simple(args: &QuizArgs, factors: &FactorTable) -> Result<()> {
    let mut session = QuizSession::new(factors, args.html_out.clone());
    print_banner();
    session.begin(true);

    let stdin = io::stdin();
    loop {
        print!("{}", PROMPT.cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        match dispatch_quiz_line(&mut session, line.trim()) {
            Ok(QuizControl::Continue) => session.show_current_question(),
            Ok(QuizControl::Exit) => break,
            Err(e) => eprintln!("{} {e}", "error:".red().bold()),
        }
    }

    Ok(())
}

#[cfg(feature = "repl-rustyline")]
fn cmd_quiz_rustyline(args: &QuizArgs, factors: &FactorTable) -> Result<()> {
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    let mut session = QuizSession::new(factors, args.html_out.clone());
    print_banner();
    session.begin(true);

    let mut rl = DefaultEditor::new().map_err(|e| anyhow!("failed to init rustyline: {e}"))?;

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(anyhow!("readline error: {e}")),
        };

        let line = line.trim();
        if !line.is_empty() {
            rl.add_history_entry(line)
                .map_err(|e| anyhow!("failed to record history: {e}"))?;
        }

        match dispatch_quiz_line(&mut session, line) {
            Ok(QuizControl::Continue) => session.show_current_question(),
            Ok(QuizControl::Exit) => break,
            Err(e) => eprintln!("{} {e}", "error:".red().bold()),
        }
    }

    Ok(())
}

fn print_banner() {
    println!("{}", "Pegada de carbono".green().bold());
    println!("Responda cada pergunta com um número (vazio conta como 0).");
    println!("Na pergunta de transporte informe também o modo: `120 onibus`.");
    println!("Comandos: `ajuda`, `reiniciar`, `sair`.\n");
}

#[derive(Debug, PartialEq, Eq)]
enum QuizControl {
    Continue,
    Exit,
}

struct QuizSession<'a> {
    factors: &'a FactorTable,
    interview: Interview,
    html_out: Option<PathBuf>,
    last_report: Option<EmissionReport>,
}

impl<'a> QuizSession<'a> {
    fn new(factors: &'a FactorTable, html_out: Option<PathBuf>) -> Self {
        Self {
            factors,
            interview: Interview::new(),
            html_out,
            last_report: None,
        }
    }

    fn begin(&mut self, show: bool) {
        self.interview.start();
        if show {
            self.show_current_question();
        }
    }

    fn restart(&mut self) {
        self.interview.reset();
        self.interview.start();
    }

    fn show_current_question(&self) {
        if let Some(question) = self.interview.current_question() {
            let (answered, total) = self.interview.progress();
            println!(
                "{} {}",
                format!("[{}/{}]", answered + 1, total).dimmed(),
                styled_question(question)
            );
        }
    }

    /// Computes, prints and writes the report of a finished interview.
    fn finish(&mut self) -> Result<QuizControl> {
        let answers = self.interview.result()?;
        match compute(answers, self.factors) {
            Ok(report) => {
                print_report(&report);
                let path = write_html_report(&report, self.html_out.as_deref())?;
                println!("{} {}", "Relatório HTML:".cyan().bold(), path.display());
                self.last_report = Some(report);
                Ok(QuizControl::Exit)
            }
            Err(degenerate) => {
                debug!(total = degenerate.total_mass_kg, "degenerate quiz result");
                println!(
                    "{}",
                    "Nenhuma emissão foi informada. Vamos recomeçar o questionário.".yellow()
                );
                self.restart();
                Ok(QuizControl::Continue)
            }
        }
    }
}

fn dispatch_quiz_line(session: &mut QuizSession<'_>, line: &str) -> Result<QuizControl> {
    match line.to_ascii_lowercase().as_str() {
        "sair" | "exit" | "quit" => return Ok(QuizControl::Exit),
        "ajuda" | "help" => {
            print_banner();
            return Ok(QuizControl::Continue);
        }
        "reiniciar" | "reset" => {
            session.restart();
            println!("{}", "Questionário reiniciado.".yellow());
            return Ok(QuizControl::Continue);
        }
        _ => {}
    }

    match session.interview.submit(line)? {
        Advance::Next(_) => Ok(QuizControl::Continue),
        Advance::Complete => session.finish(),
    }
}

/// Question text on its category color, the way the chart shows it.
fn styled_question(question: &Question) -> colored::ColoredString {
    let text = format!(" {} ", question.text());
    match (hex_rgb(question.color()), hex_rgb(question.foreground())) {
        (Some((br, bg, bb)), Some((fr, fg, fb))) => {
            text.truecolor(fr, fg, fb).on_truecolor(br, bg, bb).bold()
        }
        _ => text.bold(),
    }
}

fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
