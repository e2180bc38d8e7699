use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const AMOUNT_NOT_AVAILABLE: &str = "N/A";
pub const JUSTIFICATION_NOT_FOUND: &str = "Justification not found.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CoverType {
    Domestic,
    International,
}

impl CoverType {
    pub fn as_str(self) -> &'static str {
        match self {
            CoverType::Domestic => "domestic",
            CoverType::International => "international",
        }
    }

    /// Capitalised form used in document headings.
    pub fn heading_label(self) -> &'static str {
        match self {
            CoverType::Domestic => "Domestic",
            CoverType::International => "International",
        }
    }
}

/// Why a request ended without a confident plan match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    ClassificationFailed,
    SectionNotFound,
    TableUnparseable,
    LowConfidenceMatch,
}

impl UnresolvedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            UnresolvedReason::ClassificationFailed => "classification_failed",
            UnresolvedReason::SectionNotFound => "section_not_found",
            UnresolvedReason::TableUnparseable => "table_unparseable",
            UnresolvedReason::LowConfidenceMatch => "low_confidence_match",
        }
    }
}

/// Which heading-delimited part of the document could not be located.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    BenefitsTable,
    Exclusions,
}

impl SectionKind {
    pub fn describe(self) -> &'static str {
        match self {
            SectionKind::BenefitsTable => "table of benefits",
            SectionKind::Exclusions => "exclusions",
        }
    }
}

pub type Row = Vec<String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub plan_name: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "plan_found")]
    pub matched: bool,
    pub plan_name: Option<String>,
    pub confidence: f32,
    #[serde(rename = "amount")]
    pub amount_fields: IndexMap<String, String>,
    pub justification: String,
    pub summary: String,
    pub cover_type: Option<CoverType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnresolvedReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_candidate: Option<Candidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeTextRequest {
    pub text: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackAnswer {
    pub plan_found: bool,
    pub answer: String,
    pub latency_ms: u128,
}

/// Terminal non-match states of the matching pipeline, with the detail needed
/// to explain them to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Unresolved {
    ClassificationFailed,
    SectionNotFound {
        cover: CoverType,
        section: SectionKind,
        heading: String,
    },
    TableUnparseable {
        cover: CoverType,
        rows: usize,
    },
    LowConfidenceMatch {
        cover: CoverType,
        best: Option<Candidate>,
        threshold: f32,
    },
}

impl Unresolved {
    pub fn reason(&self) -> UnresolvedReason {
        match self {
            Unresolved::ClassificationFailed => UnresolvedReason::ClassificationFailed,
            Unresolved::SectionNotFound { .. } => UnresolvedReason::SectionNotFound,
            Unresolved::TableUnparseable { .. } => UnresolvedReason::TableUnparseable,
            Unresolved::LowConfidenceMatch { .. } => UnresolvedReason::LowConfidenceMatch,
        }
    }

    pub fn cover(&self) -> Option<CoverType> {
        match self {
            Unresolved::ClassificationFailed => None,
            Unresolved::SectionNotFound { cover, .. }
            | Unresolved::TableUnparseable { cover, .. }
            | Unresolved::LowConfidenceMatch { cover, .. } => Some(*cover),
        }
    }
}

/// Body of a successful analysis request: the table match, or the remote
/// model's answer when that mode was requested.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Matched(MatchResult),
    Remote(FallbackAnswer),
}
