use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metadata::PageSeoMetadata;

pub const TITLE_MIN_CHARS: usize = 30;
pub const TITLE_MAX_CHARS: usize = 60;
pub const DESCRIPTION_MIN_CHARS: usize = 120;
pub const DESCRIPTION_MAX_CHARS: usize = 160;

const ERROR_PENALTY: u8 = 25;
const WARNING_PENALTY: u8 = 10;

/// Form field a validation entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Description,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Title => f.write_str("title"),
            Field::Description => f.write_str("description"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: Field,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Letter grade derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// Colour band used when displaying a percentage score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => ScoreBand::Good,
            50..=79 => ScoreBand::Fair,
            _ => ScoreBand::Poor,
        }
    }
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// No errors present. Warnings never block.
    pub is_valid: bool,
    /// 0 to 100
    pub score: u8,
    pub grade: Grade,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub successes: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }

    pub fn has_error_for(&self, field: Field) -> bool {
        self.errors.iter().any(|issue| issue.field == field)
    }
}

#[derive(Default)]
struct Findings {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    successes: Vec<ValidationIssue>,
}

impl Findings {
    /// Required field with an advisory length window, measured in chars
    fn check_length(&mut self, field: Field, value: &str, min: usize, max: usize) {
        if value.trim().is_empty() {
            self.errors
                .push(ValidationIssue::new(field, format!("{} is required", field)));
            return;
        }

        let len = value.chars().count();
        if len < min {
            self.warnings.push(ValidationIssue::new(
                field,
                format!("{} is too short ({} chars, aim for {}-{})", field, len, min, max),
            ));
        } else if len > max {
            self.warnings.push(ValidationIssue::new(
                field,
                format!("{} is too long ({} chars, aim for {}-{})", field, len, min, max),
            ));
        } else {
            self.successes.push(ValidationIssue::new(
                field,
                format!("{} length is optimal ({} chars)", field, len),
            ));
        }
    }
}

/// Score a page's SEO fields
pub fn validate(page: &PageSeoMetadata) -> ValidationResult {
    let mut findings = Findings::default();
    findings.check_length(Field::Title, &page.title, TITLE_MIN_CHARS, TITLE_MAX_CHARS);
    findings.check_length(
        Field::Description,
        &page.description,
        DESCRIPTION_MIN_CHARS,
        DESCRIPTION_MAX_CHARS,
    );

    let penalty = findings.errors.len() * ERROR_PENALTY as usize
        + findings.warnings.len() * WARNING_PENALTY as usize;
    let score = 100usize.saturating_sub(penalty) as u8;

    ValidationResult {
        is_valid: findings.errors.is_empty(),
        score,
        grade: Grade::from_score(score),
        errors: findings.errors,
        warnings: findings.warnings,
        successes: findings.successes,
    }
}
