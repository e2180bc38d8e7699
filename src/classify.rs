use crate::config::KeywordConfig;
use crate::models::CoverType;
use crate::text::collapse_whitespace;

/// Maps a prompt to a cover type by keyword presence.
///
/// Domestic keywords are checked first, so a prompt mentioning both variants is
/// classified as domestic.
#[derive(Clone, Debug)]
pub struct CoverTypeClassifier {
    domestic: Vec<String>,
    international: Vec<String>,
}

impl CoverTypeClassifier {
    pub fn new(keywords: &KeywordConfig) -> Self {
        Self {
            domestic: normalize_keywords(&keywords.domestic),
            international: normalize_keywords(&keywords.international),
        }
    }

    pub fn classify(&self, prompt: &str) -> Option<CoverType> {
        let prompt = collapse_whitespace(prompt);

        if contains_any(&prompt, &self.domestic) {
            Some(CoverType::Domestic)
        } else if contains_any(&prompt, &self.international) {
            Some(CoverType::International)
        } else {
            None
        }
    }
}

impl Default for CoverTypeClassifier {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| collapse_whitespace(k))
        .filter(|k| !k.is_empty())
        .collect()
}

fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_cover_type() {
        let classifier = CoverTypeClassifier::default();
        assert_eq!(
            classifier.classify("My DOMESTIC policy"),
            Some(CoverType::Domestic)
        );
        assert_eq!(
            classifier.classify("travelling abroad next month"),
            Some(CoverType::International)
        );
        assert_eq!(
            classifier.classify("treatment within   country"),
            Some(CoverType::Domestic)
        );
    }

    #[test]
    fn domestic_wins_when_both_are_mentioned() {
        let classifier = CoverTypeClassifier::default();
        assert_eq!(
            classifier.classify("international or domestic, which applies?"),
            Some(CoverType::Domestic)
        );
    }

    #[test]
    fn prompts_without_keywords_are_unknown() {
        let classifier = CoverTypeClassifier::default();
        for prompt in ["what about my plan", "", "gold plan amount", "cover for dental"] {
            assert_eq!(classifier.classify(prompt), None, "prompt: {prompt:?}");
        }
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let classifier = CoverTypeClassifier::new(&KeywordConfig {
            domestic: vec!["local".to_string()],
            international: vec!["overseas".to_string()],
        });
        assert_eq!(classifier.classify("local care"), Some(CoverType::Domestic));
        assert_eq!(classifier.classify("overseas"), Some(CoverType::International));
        assert_eq!(classifier.classify("domestic"), None);
    }
}
