use indexmap::IndexMap;

use crate::matcher::PlanMatch;
use crate::models::{CoverType, MatchResult, Row, Unresolved, AMOUNT_NOT_AVAILABLE};
use crate::table::BenefitsTable;

const AMOUNT_KEY: &str = "Amount";

/// Pairs each heading after the plan column with the matching cell of `row`.
/// Cells beyond the headings row get positional names.
pub fn amount_fields(headings: &Row, row: &Row) -> IndexMap<String, String> {
    if row.len() <= 1 {
        return not_available();
    }

    row.iter()
        .enumerate()
        .skip(1)
        .map(|(i, cell)| {
            let heading = headings
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("column{i}"));
            (heading, cell.clone())
        })
        .collect()
}

pub fn assemble_match(
    cover: CoverType,
    table: &BenefitsTable,
    plan: &PlanMatch,
    justification: String,
) -> MatchResult {
    let amounts = table
        .plans
        .get(plan.index)
        .map(|row| amount_fields(&table.headings, row))
        .unwrap_or_else(not_available);

    let summary = format!(
        "Plan '{}' was matched from the {} table.\nAmount Details: {}\nJustification: {}",
        plan.plan_name,
        cover.as_str(),
        describe_amounts(&amounts),
        justification
    );

    MatchResult {
        matched: true,
        plan_name: Some(plan.plan_name.clone()),
        confidence: plan.score.clamp(0.0, 1.0),
        amount_fields: amounts,
        justification,
        summary,
        cover_type: Some(cover),
        reason: None,
        best_candidate: None,
    }
}

pub fn assemble_unresolved(unresolved: &Unresolved) -> MatchResult {
    let (justification, summary, confidence, best_candidate) = match unresolved {
        Unresolved::ClassificationFailed => (
            "Cover type not recognized.".to_string(),
            "Please mention whether your question is about 'domestic' or 'international' cover."
                .to_string(),
            0.0,
            None,
        ),
        Unresolved::SectionNotFound {
            section, heading, ..
        } => (
            "Relevant table or exclusions section not found.".to_string(),
            format!(
                "Unable to locate required sections in document: missing {} (\"{}\").",
                section.describe(),
                heading
            ),
            0.0,
            None,
        ),
        Unresolved::TableUnparseable { rows, .. } => (
            "Table format not recognized.".to_string(),
            format!("Unable to extract table rows ({rows} row(s) recovered)."),
            0.0,
            None,
        ),
        Unresolved::LowConfidenceMatch {
            best, threshold, ..
        } => {
            let summary = match best {
                Some(best) => format!(
                    "Could not confidently match plan. Closest candidate '{}' scored {:.2} (threshold {:.2}).",
                    best.plan_name, best.score, threshold
                ),
                None => "Could not confidently match plan. The table lists no plans.".to_string(),
            };
            (
                "Plan not found with sufficient confidence.".to_string(),
                summary,
                best.as_ref().map(|b| b.score.clamp(0.0, 1.0)).unwrap_or(0.0),
                best.clone(),
            )
        }
    };

    MatchResult {
        matched: false,
        plan_name: None,
        confidence,
        amount_fields: not_available(),
        justification,
        summary,
        cover_type: unresolved.cover(),
        reason: Some(unresolved.reason()),
        best_candidate,
    }
}

fn not_available() -> IndexMap<String, String> {
    IndexMap::from([(AMOUNT_KEY.to_string(), AMOUNT_NOT_AVAILABLE.to_string())])
}

fn describe_amounts(amounts: &IndexMap<String, String>) -> String {
    amounts
        .iter()
        .map(|(heading, value)| format!("{heading}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
