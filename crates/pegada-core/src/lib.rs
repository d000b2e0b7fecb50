//! Pegada: annual carbon footprint estimation.
//!
//! ```text
//!  Interview ──┐
//!              ├──► AnswerSet ──compute(·, &FactorTable)──► EmissionReport ──render──► JSON / HTML
//!  request  ───┘
//! ```
//!
//! - [`factors`]: factor table, loaded once and passed explicitly
//! - [`interview`]: the question-by-question state machine
//! - [`request`]: the flat JSON payload of the web handler
//! - [`calculator`]: pure computation shared by both entry points
//! - [`report`]: structured and HTML renderings

pub mod answers;
pub mod calculator;
pub mod factors;
pub mod interview;
pub mod report;
pub mod request;

pub use answers::{AnswerSet, Category, InvalidAnswer, RawAnswer, ValidationReason};
pub use calculator::{compute, CategoryResult, DegenerateResult, EmissionReport};
pub use factors::FactorTable;
pub use interview::{Advance, Interview, InterviewError, InterviewState, Question, QUESTIONS};
pub use report::{render, RenderedReport, ReportFormat, StructuredReport};
pub use request::{handle_calculation, CalculationRequest, RequestError};
