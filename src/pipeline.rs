use crate::assemble::{assemble_match, assemble_unresolved};
use crate::classify::CoverTypeClassifier;
use crate::config::MatchingConfig;
use crate::justification::JustificationRetriever;
use crate::matcher::{MatchOutcome, PlanMatcher};
use crate::models::{MatchResult, SectionKind, Unresolved};
use crate::section::{extract_section, HeadingTemplate};
use crate::similarity::build_scorer;
use crate::table::{parse_rows, BenefitsTable};
use crate::text::normalize_text;

/// Progress of a single analysis. `Assembled` and `Unresolved` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    CoverTypeResolved,
    SectionsLocated,
    TableParsed,
    PlanMatched,
    JustificationResolved,
    Assembled,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Assembled(MatchResult),
    Unresolved(Unresolved),
}

impl Outcome {
    pub fn is_assembled(&self) -> bool {
        matches!(self, Outcome::Assembled(_))
    }

    pub fn into_result(self) -> MatchResult {
        match self {
            Outcome::Assembled(result) => result,
            Outcome::Unresolved(unresolved) => assemble_unresolved(&unresolved),
        }
    }
}

/// Runs the cover-type, section, table, matching and justification stages over
/// one document and prompt. Holds no per-request state and can be shared
/// between concurrent requests.
#[derive(Clone)]
pub struct PolicyAnalyzer {
    classifier: CoverTypeClassifier,
    matcher: PlanMatcher,
    justifier: JustificationRetriever,
}

impl PolicyAnalyzer {
    pub fn new(config: &MatchingConfig) -> Self {
        let scorer = build_scorer(config.strategy, config.ngram_size);
        Self {
            classifier: CoverTypeClassifier::new(&config.keywords),
            matcher: PlanMatcher::new(scorer.clone(), config.threshold),
            justifier: JustificationRetriever::new(config.justification_mode, scorer),
        }
    }

    pub fn analyze(&self, document: &str, prompt: &str) -> MatchResult {
        self.evaluate(document, prompt).into_result()
    }

    pub fn evaluate(&self, document: &str, prompt: &str) -> Outcome {
        let mut stage = Stage::Start;
        let outcome = self.run(document, prompt, &mut stage);

        match &outcome {
            Outcome::Assembled(result) => tracing::info!(
                plan = result.plan_name.as_deref().unwrap_or_default(),
                confidence = result.confidence,
                "plan matched"
            ),
            Outcome::Unresolved(unresolved) => tracing::info!(
                reason = unresolved.reason().as_str(),
                after = ?stage,
                "analysis unresolved"
            ),
        }

        outcome
    }

    fn run(&self, document: &str, prompt: &str, stage: &mut Stage) -> Outcome {
        let Some(cover) = self.classifier.classify(prompt) else {
            return Outcome::Unresolved(Unresolved::ClassificationFailed);
        };
        advance(stage, Stage::CoverTypeResolved);

        let text = normalize_text(document);
        let headings = HeadingTemplate::for_cover(cover);

        let table_section = extract_section(&text, &headings.table_start, &headings.table_end);
        if table_section.is_empty() {
            return Outcome::Unresolved(Unresolved::SectionNotFound {
                cover,
                section: SectionKind::BenefitsTable,
                heading: headings.table_start,
            });
        }

        let exclusions = extract_section(
            &text,
            &headings.exclusions_start,
            &headings.exclusions_end,
        );
        if exclusions.is_empty() {
            return Outcome::Unresolved(Unresolved::SectionNotFound {
                cover,
                section: SectionKind::Exclusions,
                heading: headings.exclusions_start,
            });
        }
        advance(stage, Stage::SectionsLocated);

        let rows = match parse_rows(table_section) {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!("table rows could not be split: {:#}", err);
                return Outcome::Unresolved(Unresolved::TableUnparseable { cover, rows: 0 });
            }
        };
        let row_count = rows.len();
        let table = match BenefitsTable::from_rows(rows) {
            Ok(Some(table)) => table,
            Ok(None) => {
                return Outcome::Unresolved(Unresolved::TableUnparseable {
                    cover,
                    rows: row_count,
                });
            }
            Err(err) => {
                tracing::warn!("table header could not be classified: {:#}", err);
                return Outcome::Unresolved(Unresolved::TableUnparseable {
                    cover,
                    rows: row_count,
                });
            }
        };
        advance(stage, Stage::TableParsed);

        let candidates = table.candidates();
        let plan = match self.matcher.best_match(prompt, &candidates) {
            MatchOutcome::Accepted(plan) => plan,
            MatchOutcome::Rejected(best) => {
                return Outcome::Unresolved(Unresolved::LowConfidenceMatch {
                    cover,
                    best: Some((&best).into()),
                    threshold: self.matcher.threshold(),
                });
            }
            MatchOutcome::NoCandidates => {
                return Outcome::Unresolved(Unresolved::LowConfidenceMatch {
                    cover,
                    best: None,
                    threshold: self.matcher.threshold(),
                });
            }
        };
        advance(stage, Stage::PlanMatched);

        let justification = self.justifier.retrieve(exclusions, &plan.plan_name);
        advance(stage, Stage::JustificationResolved);

        let result = assemble_match(cover, &table, &plan, justification);
        advance(stage, Stage::Assembled);
        Outcome::Assembled(result)
    }
}

impl Default for PolicyAnalyzer {
    fn default() -> Self {
        Self::new(&MatchingConfig::default())
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = ?*stage, to = ?next, "analysis stage");
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::justification::JustificationMode;
    use crate::models::{CoverType, UnresolvedReason};
    use crate::similarity::StrategyKind;

    const SCENARIO_DOC: &str = "Table of Benefits for Domestic Cover\nGold   100000\nSilver   50000\nExclusions - Domestic Cover\nGold plan excludes dental.\n";

    fn unresolved(outcome: Outcome) -> Unresolved {
        match outcome {
            Outcome::Unresolved(unresolved) => unresolved,
            Outcome::Assembled(result) => panic!("expected unresolved, got {result:?}"),
        }
    }

    #[test]
    fn scenario_gold_plan_is_matched() {
        let result = PolicyAnalyzer::default().analyze(SCENARIO_DOC, "I have the gold plan, domestic cover");

        assert!(result.matched);
        assert_eq!(result.plan_name.as_deref(), Some("Gold"));
        assert!(result.confidence >= 0.3);
        let amounts: Vec<_> = result
            .amount_fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(amounts, vec![("column1", "100000")]);
        assert!(result.justification.contains("Gold plan excludes dental."));
        assert_eq!(result.cover_type, Some(CoverType::Domestic));
        assert!(result.reason.is_none());
    }

    #[test]
    fn scenario_missing_cover_keyword_is_unresolved() {
        let outcome = PolicyAnalyzer::default().evaluate(SCENARIO_DOC, "what about my plan");
        assert_eq!(unresolved(outcome), Unresolved::ClassificationFailed);

        let result = PolicyAnalyzer::default().analyze(SCENARIO_DOC, "what about my plan");
        assert!(!result.matched);
        assert!(result.summary.contains("'domestic' or 'international'"));
    }

    #[test]
    fn scenario_missing_table_heading_is_section_not_found() {
        let doc = "Schedule of Benefits\nGold   100000\nExclusions - Domestic Cover\nGold plan excludes dental.\n";
        let outcome = PolicyAnalyzer::default().evaluate(doc, "gold plan, domestic");
        match unresolved(outcome) {
            Unresolved::SectionNotFound { section, heading, .. } => {
                assert_eq!(section, SectionKind::BenefitsTable);
                assert_eq!(heading, "Table of Benefits for Domestic Cover");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn international_prompt_against_domestic_document_is_section_not_found() {
        let result = PolicyAnalyzer::default().analyze(SCENARIO_DOC, "gold plan while abroad");
        assert_eq!(result.reason, Some(UnresolvedReason::SectionNotFound));
        assert_eq!(result.cover_type, Some(CoverType::International));
    }

    #[test]
    fn missing_exclusions_is_section_not_found() {
        // The table runs to the end of the document, but there is no exclusions passage.
        let doc = "Table of Benefits for Domestic Cover\nPlan   Limit\nGold   100000\n";
        let outcome = PolicyAnalyzer::default().evaluate(doc, "gold domestic");
        match unresolved(outcome) {
            Unresolved::SectionNotFound { section, .. } => {
                assert_eq!(section, SectionKind::Exclusions)
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn scenario_header_only_table_is_unparseable() {
        let doc = "Table of Benefits for Domestic Cover\nPlan   Sum Insured\nExclusions - Domestic Cover\nGold plan excludes dental.\n";
        let outcome = PolicyAnalyzer::default().evaluate(doc, "gold plan domestic");
        assert_eq!(
            unresolved(outcome),
            Unresolved::TableUnparseable {
                cover: CoverType::Domestic,
                rows: 1
            }
        );
    }

    #[test]
    fn scenario_unrelated_prompt_is_low_confidence() {
        let outcome = PolicyAnalyzer::default().evaluate(SCENARIO_DOC, "xyzzy plugh domestic");
        match unresolved(outcome.clone()) {
            Unresolved::LowConfidenceMatch { best, threshold, .. } => {
                let best = best.expect("best candidate is reported");
                assert_eq!(best.score, 0.0);
                assert_eq!(best.plan_name, "Gold");
                assert_eq!(threshold, 0.3);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let result = outcome.into_result();
        assert!(!result.matched);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.reason, Some(UnresolvedReason::LowConfidenceMatch));
    }

    #[test]
    fn header_row_table_uses_its_headings() {
        let doc = "Table of Benefits for International Cover\nPlan   Sum Insured   Co-pay\nGlobal Gold   USD 250,000   10%\nGlobal Silver   USD 100,000   20%\nExclusions - International Cover\nGlobal Silver excludes maternity.\nSection 5 Claims\n";
        let result = PolicyAnalyzer::default().analyze(doc, "Global Silver cover abroad");

        assert!(result.matched, "{result:?}");
        assert_eq!(result.plan_name.as_deref(), Some("Global Silver"));
        assert_eq!(
            result.amount_fields.get("Sum Insured").map(String::as_str),
            Some("USD 100,000")
        );
        assert_eq!(result.amount_fields.get("Co-pay").map(String::as_str), Some("20%"));
        assert_eq!(result.justification, "Global Silver excludes maternity.");
    }

    #[test]
    fn threshold_is_configurable() {
        let strict = PolicyAnalyzer::new(&MatchingConfig {
            threshold: 0.9,
            ..MatchingConfig::default()
        });
        let outcome = strict.evaluate(SCENARIO_DOC, "I have the gold plan, domestic cover");
        assert!(!outcome.is_assembled());
    }

    #[test]
    fn alternative_strategies_plug_in() {
        let analyzer = PolicyAnalyzer::new(&MatchingConfig {
            strategy: StrategyKind::Jaccard,
            justification_mode: JustificationMode::Similarity,
            ..MatchingConfig::default()
        });
        let result = analyzer.analyze(SCENARIO_DOC, "gold domestic");
        assert!(result.matched, "{result:?}");
        assert_eq!(result.plan_name.as_deref(), Some("Gold"));
        assert_eq!(result.justification, "Gold plan excludes dental.");
    }

    #[test]
    fn typographic_dashes_in_headings_still_match() {
        let doc = SCENARIO_DOC.replace("Exclusions - ", "Exclusions \u{2013} ");
        let result = PolicyAnalyzer::default().analyze(&doc, "I have the gold plan, domestic cover");
        assert!(result.matched);
    }
}
