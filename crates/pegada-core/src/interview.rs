//! Interview state machine.
//!
//! ```text
//! NotStarted ──start──► Asking(0) ──submit──► Asking(1) … Asking(4) ──submit──► Complete
//!      ▲                                                                          │
//!      └──────────────────────────────── reset (from any state) ◄─────────────────┘
//! ```
//!
//! Answers are annualized when submitted, using the multiplier of the question
//! being answered. Presentation layers only read [`Interview::current_question`]
//! and call [`Interview::submit`]; they never see the state machine internals.

use thiserror::Error;
use tracing::debug;

use crate::answers::{parse_quantity, AnswerSet, Category, RawAnswer, ValidationReason};

/// One interview step. Static configuration, not user input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Question {
    pub category: Category,
    pub emoji: &'static str,
    pub prompt: &'static str,
    /// Converts the asked period into a yearly quantity (×12 monthly, ×52 weekly).
    pub annual_multiplier: f64,
}

impl Question {
    pub fn text(&self) -> String {
        format!("{} {}", self.emoji, self.prompt)
    }

    /// Background color of the question screen (same as the chart color).
    pub fn color(&self) -> &'static str {
        self.category.color()
    }

    /// Readable text color on top of [`Question::color`].
    pub fn foreground(&self) -> &'static str {
        foreground_for(self.color())
    }
}

pub static QUESTIONS: [Question; 5] = [
    Question {
        category: Category::Energy,
        emoji: "💡",
        prompt: "Consumo de energia elétrica por mês (kWh)",
        annual_multiplier: 12.0,
    },
    Question {
        category: Category::Transport,
        emoji: "🚗",
        prompt: "Quantos km você percorre por semana?",
        annual_multiplier: 52.0,
    },
    Question {
        category: Category::Diet,
        emoji: "🍖",
        prompt: "Quantos kg de carne você consome por semana?",
        annual_multiplier: 52.0,
    },
    Question {
        category: Category::Flight,
        emoji: "✈️",
        prompt: "Quantas horas de voo você fez neste ano?",
        annual_multiplier: 1.0,
    },
    Question {
        category: Category::Waste,
        emoji: "🗑️",
        prompt: "Quantos kg de lixo você gera por semana?",
        annual_multiplier: 52.0,
    },
];

/// White on dark backgrounds, near-black otherwise (perceptual luminance).
pub fn foreground_for(hex_color: &str) -> &'static str {
    const LIGHT: &str = "#ffffff";
    const DARK: &str = "#222222";

    let hex = hex_color.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range).and_then(|c| u8::from_str_radix(c, 16).ok())
    };
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => {
            let luminance = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
            if luminance < 140.0 {
                LIGHT
            } else {
                DARK
            }
        }
        _ => DARK,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewState {
    NotStarted,
    Asking(usize),
    Complete,
}

/// Outcome of an accepted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Complete,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterviewError {
    #[error("invalid answer `{raw}` for {category}: {reason}")]
    Validation {
        category: Category,
        raw: String,
        reason: ValidationReason,
    },
    #[error("the interview is not waiting for an answer ({state:?})")]
    NotAsking { state: InterviewState },
    #[error("the interview is not complete ({answered} of {total} answered)")]
    NotComplete { answered: usize, total: usize },
}

/// Collects one answer per question, in fixed order.
#[derive(Debug, Clone)]
pub struct Interview {
    questions: &'static [Question],
    state: InterviewState,
    answers: AnswerSet,
}

impl Default for Interview {
    fn default() -> Self {
        Self::new()
    }
}

impl Interview {
    pub fn new() -> Self {
        Self {
            questions: &QUESTIONS,
            state: InterviewState::NotStarted,
            answers: AnswerSet::new(),
        }
    }

    pub fn state(&self) -> InterviewState {
        self.state
    }

    /// `NotStarted → Asking(0)`. No effect in any other state.
    pub fn start(&mut self) {
        if self.state == InterviewState::NotStarted {
            self.state = InterviewState::Asking(0);
        }
    }

    pub fn current_question(&self) -> Option<&'static Question> {
        match self.state {
            InterviewState::Asking(i) => self.questions.get(i),
            InterviewState::NotStarted | InterviewState::Complete => None,
        }
    }

    /// `(answered, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.answers.len(), self.questions.len())
    }

    /// Answers accepted so far (possibly partial).
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    /// Validates `raw`, stores the annualized answer and advances.
    ///
    /// On error the state is unchanged and the same question stays current.
    /// The transport question takes an optional mode after the distance
    /// (`"120 onibus"`).
    pub fn submit(&mut self, raw: &str) -> Result<Advance, InterviewError> {
        let (index, question) = match self.state {
            InterviewState::Asking(i) => match self.questions.get(i) {
                Some(q) => (i, q),
                None => return Err(InterviewError::NotAsking { state: self.state }),
            },
            state => return Err(InterviewError::NotAsking { state }),
        };

        let reject = |reason: ValidationReason| InterviewError::Validation {
            category: question.category,
            raw: raw.to_string(),
            reason,
        };

        let mut tokens = raw.split_whitespace();
        let amount = tokens.next().unwrap_or("");
        let mode = tokens.next();
        if tokens.next().is_some() || (mode.is_some() && question.category != Category::Transport) {
            return Err(reject(ValidationReason::UnexpectedToken));
        }

        let value = parse_quantity(amount).ok_or_else(|| reject(ValidationReason::NotANumber))?;
        let answer = RawAnswer::new(question.category, value * question.annual_multiplier)
            .map_err(|invalid| reject(invalid.reason))?
            .with_mode(mode);

        debug!(
            category = %question.category,
            annual_value = answer.value(),
            "interview answer accepted"
        );
        self.answers.insert(answer);

        let next = index + 1;
        if next == self.questions.len() {
            self.state = InterviewState::Complete;
            Ok(Advance::Complete)
        } else {
            self.state = InterviewState::Asking(next);
            Ok(Advance::Next(next))
        }
    }

    /// Drops all answers and returns to `NotStarted`.
    pub fn reset(&mut self) {
        self.answers.clear();
        self.state = InterviewState::NotStarted;
    }

    pub fn result(&self) -> Result<&AnswerSet, InterviewError> {
        match self.state {
            InterviewState::Complete => Ok(&self.answers),
            _ => Err(self.not_complete()),
        }
    }

    pub fn into_result(self) -> Result<AnswerSet, InterviewError> {
        match self.state {
            InterviewState::Complete => Ok(self.answers),
            _ => Err(self.not_complete()),
        }
    }

    fn not_complete(&self) -> InterviewError {
        let (answered, total) = self.progress();
        InterviewError::NotComplete { answered, total }
    }
}
