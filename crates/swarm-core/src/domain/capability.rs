//! Capability tags.
//!
//! Tasks advertise the skills they need as tags such as `#SKILL_PYTHON`;
//! workers advertise what they can do the same way. Comparison always happens
//! on the normalized form: leading `#` markers stripped, case folded.
//! `#SKILL_X` and `skill_x` are the same capability.

use std::collections::HashSet;

/// Marker prefixed to capability tags in posts and profiles.
pub const TAG_MARKER: char = '#';

/// Prefix used when a tag is synthesized from a skill name.
pub const SKILL_PREFIX: &str = "SKILL_";

/// Normalize a single tag for comparison.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches(TAG_MARKER).to_lowercase()
}

/// Tag advertised for a skill registered without explicit tags.
///
/// `python` -> `#SKILL_PYTHON`
pub fn default_tag(skill_name: &str) -> String {
    format!("{TAG_MARKER}{SKILL_PREFIX}{}", skill_name.to_uppercase())
}

/// Normalized set of tags. Blank entries are dropped.
pub fn normalized_set<I, S>(tags: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| normalize_tag(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Any-of match: true iff the normalized sets share at least one tag.
pub fn intersects<A, B, S1, S2>(required: A, available: B) -> bool
where
    A: IntoIterator<Item = S1>,
    B: IntoIterator<Item = S2>,
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    let available = normalized_set(available);
    if available.is_empty() {
        return false;
    }
    required
        .into_iter()
        .map(|t| normalize_tag(t.as_ref()))
        .any(|t| available.contains(&t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("#SKILL_PYTHON", "skill_python")]
    #[case("skill_python", "skill_python")]
    #[case("  #Skill_Code ", "skill_code")]
    #[case("##SKILL_X", "skill_x")]
    fn normalization_strips_marker_and_folds_case(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_tag(raw), expected);
    }

    #[test]
    fn default_tag_is_uppercased_and_marked() {
        assert_eq!(default_tag("python"), "#SKILL_PYTHON");
        assert_eq!(default_tag("Code"), "#SKILL_CODE");
    }

    #[rstest]
    #[case(&["#SKILL_CODE", "#SKILL_PYTHON"], &["skill_python"], true)]
    #[case(&["#SKILL_CODE"], &["#SKILL_JAVA", "#skill_code"], true)]
    #[case(&["#SKILL_CODE"], &["#SKILL_JAVA"], false)]
    #[case(&[], &["#SKILL_JAVA"], false)]
    #[case(&["#SKILL_JAVA"], &[], false)]
    fn intersection_is_any_of(
        #[case] required: &[&str],
        #[case] available: &[&str],
        #[case] expected: bool,
    ) {
        assert_eq!(intersects(required, available), expected);
    }

    #[test]
    fn blank_tags_never_match() {
        assert!(!intersects(["#"], ["", "#"]));
    }
}
