use regex::{Regex, RegexBuilder};

use crate::models::CoverType;

const SECTION_END: &str = "Section";

/// Heading anchors used to cut the benefits table and exclusions passage out of
/// a policy document of one cover type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingTemplate {
    pub table_start: String,
    pub table_end: Vec<String>,
    pub exclusions_start: String,
    pub exclusions_end: Vec<String>,
}

impl HeadingTemplate {
    pub fn for_cover(cover: CoverType) -> Self {
        let label = cover.heading_label();
        let exclusions = format!("Exclusions - {label} Cover");

        Self {
            table_start: format!("Table of Benefits for {label} Cover"),
            table_end: vec![exclusions.clone()],
            exclusions_start: exclusions,
            exclusions_end: vec![SECTION_END.to_string()],
        }
    }
}

/// Returns the text between `start` and the first of `ends` (in priority order)
/// that occurs after it, trimmed.
///
/// Matching is case-insensitive and strictly first-occurrence. A missing start
/// heading yields an empty string; a missing end heading runs the section to
/// the end of the document.
pub fn extract_section<'a, S>(text: &'a str, start: &str, ends: &[S]) -> &'a str
where
    S: AsRef<str>,
{
    let Some((_, body_start)) = find_heading(text, start, 0) else {
        return "";
    };

    let body_end = ends
        .iter()
        .find_map(|end| find_heading(text, end.as_ref(), body_start))
        .map(|(end_start, _)| end_start)
        .unwrap_or(text.len());

    text[body_start..body_end].trim()
}

/// Byte range of the first case-insensitive occurrence of `heading` at or after `from`.
fn find_heading(text: &str, heading: &str, from: usize) -> Option<(usize, usize)> {
    if heading.trim().is_empty() {
        return None;
    }

    let pattern = match heading_regex(heading) {
        Ok(pattern) => pattern,
        Err(err) => {
            tracing::warn!(heading, "could not build heading matcher: {}", err);
            return None;
        }
    };

    pattern.find_at(text, from).map(|m| (m.start(), m.end()))
}

fn heading_regex(heading: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(heading))
        .case_insensitive(true)
        .build()
}
