//! Folder name patterns.
//!
//! A pattern describes the shape of an experiment folder name with named extraction
//! points written between `$` signs:
//!
//! - `$name$` matches one or more characters, as few as the rest of the pattern allows
//! - `$name%N$` matches exactly N characters
//!
//! Everything else in the pattern must appear verbatim in the folder name. For example
//! the pattern `$name$_$date%8$_v$ver$` applied to `MyExp_20260121_v2` yields
//! `name = MyExp`, `date = 20260121` and `ver = 2`.
//!
//! Patterns are typed by the user and previewed live, so [`extract`] never fails: a
//! pattern that does not compile or a name that does not fit both give an empty result.

use fxhash::FxHashMap;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::error::PatternError;

const DELIMITER: char = '$';
const WIDTH_MARKER: char = '%';
/// The interactive cache is dropped wholesale past this many templates
const MAX_CACHED_PATTERNS: usize = 64;

/// One piece of a parsed pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Field { name: String, width: Option<usize> },
}

/// The values pulled out of a name, in the order the placeholders appear in the pattern.
///
/// Empty when the name did not match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    entries: Vec<(String, String)>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Get the value captured by a placeholder
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.entries
    }
}

impl FromIterator<(String, String)> for ExtractedFields {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for ExtractedFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in self.entries.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A compiled folder name pattern
#[derive(Debug, Clone)]
pub struct FolderPattern {
    segments: Vec<Segment>,
    names: Vec<String>,
    matcher: Regex,
}

impl FolderPattern {
    /// Compile a pattern.
    ///
    /// Fails if the pattern has no placeholders, reuses a placeholder name, or produces
    /// an expression the regex engine refuses (typically an enormous fixed length).
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let segments = tokenize(template)?;
        let mut names: Vec<String> = Vec::new();
        let mut expression = String::from("^");
        for segment in segments.iter() {
            match segment {
                Segment::Literal(text) => expression.push_str(&regex::escape(text)),
                Segment::Field { name, width } => {
                    if names.contains(name) {
                        return Err(PatternError::DuplicateName(name.clone()));
                    }
                    names.push(name.clone());
                    match width {
                        Some(n) => expression.push_str(&format!("(.{{{n}}})")),
                        None => expression.push_str("(.+?)"),
                    }
                }
            }
        }

        if names.is_empty() {
            return Err(PatternError::NoPlaceholders);
        }
        expression.push('$');

        let matcher = Regex::new(&expression)
            .map_err(|e| PatternError::InvalidExpression(e.to_string()))?;

        Ok(Self {
            segments,
            names,
            matcher,
        })
    }

    /// Placeholder names in pattern order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match a whole name against the pattern
    pub fn extract(&self, subject: &str) -> ExtractedFields {
        if subject.is_empty() {
            return ExtractedFields::default();
        }
        let Some(captures) = self.matcher.captures(subject) else {
            return ExtractedFields::default();
        };
        self.names
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| {
                captures
                    .get(idx + 1)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect()
    }

    /// Substitute values back into the pattern's literal skeleton.
    ///
    /// Returns None if a placeholder has no value.
    pub fn render(&self, fields: &ExtractedFields) -> Option<String> {
        let mut rendered = String::new();
        for segment in self.segments.iter() {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Field { name, .. } => rendered.push_str(fields.get(name)?),
            }
        }
        Some(rendered)
    }
}

/// Split a pattern into literal text and placeholders.
///
/// Placeholders are found left to right without overlapping. A `$` that does not open a
/// well formed placeholder is ordinary text.
pub fn tokenize(template: &str) -> Result<Vec<Segment>, PatternError> {
    let chars: Vec<char> = template.chars().collect();
    let mut segments: Vec<Segment> = Vec::new();
    let mut literal = String::new();
    let mut idx = 0;
    while idx < chars.len() {
        if chars[idx] == DELIMITER {
            if let Some((name, digits, next)) = scan_placeholder(&chars, idx) {
                let width = match digits {
                    Some(d) => Some(
                        d.parse::<usize>()
                            .map_err(|_| PatternError::InvalidWidth(name.clone()))?,
                    ),
                    None => None,
                };
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field { name, width });
                idx = next;
                continue;
            }
        }
        literal.push(chars[idx]);
        idx += 1;
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Try to read `$name$` or `$name%digits$` starting at `start`.
///
/// Returns the name, the width digits if any, and the index just past the closing `$`.
fn scan_placeholder(chars: &[char], start: usize) -> Option<(String, Option<String>, usize)> {
    let mut idx = start + 1;
    let mut name = String::new();
    while idx < chars.len() && chars[idx] != DELIMITER && chars[idx] != WIDTH_MARKER {
        name.push(chars[idx]);
        idx += 1;
    }
    if name.is_empty() || idx >= chars.len() {
        return None;
    }

    if chars[idx] == DELIMITER {
        return Some((name, None, idx + 1));
    }

    // chars[idx] is the width marker
    idx += 1;
    let mut digits = String::new();
    while idx < chars.len() && chars[idx].is_ascii_digit() {
        digits.push(chars[idx]);
        idx += 1;
    }
    if digits.is_empty() || idx >= chars.len() || chars[idx] != DELIMITER {
        return None;
    }
    Some((name, Some(digits), idx + 1))
}

/// Extract the placeholder values of `template` from `subject`.
///
/// Returns an empty result if either string is empty, the template has no placeholders
/// or does not compile, or the subject does not fit the template.
pub fn extract(template: &str, subject: &str) -> ExtractedFields {
    if template.is_empty() || subject.is_empty() {
        return ExtractedFields::default();
    }
    match FolderPattern::compile(template) {
        Ok(pattern) => pattern.extract(subject),
        Err(e) => {
            spdlog::debug!("Folder pattern {template:?} not usable: {e}");
            ExtractedFields::default()
        }
    }
}

/// Keeps compiled patterns around for callers that re-run the same template often,
/// such as a live preview.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: FxHashMap<String, Result<FolderPattern, PatternError>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile (or fetch) a template
    pub fn get(&mut self, template: &str) -> &Result<FolderPattern, PatternError> {
        if !self.compiled.contains_key(template) && self.compiled.len() >= MAX_CACHED_PATTERNS {
            self.compiled.clear();
        }
        self.compiled
            .entry(template.to_string())
            .or_insert_with(|| FolderPattern::compile(template))
    }

    /// Same contract as [`extract`]
    pub fn extract(&mut self, template: &str, subject: &str) -> ExtractedFields {
        if template.is_empty() || subject.is_empty() {
            return ExtractedFields::default();
        }
        match self.get(template) {
            Ok(pattern) => pattern.extract(subject),
            Err(_) => ExtractedFields::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(fields: &ExtractedFields) -> Vec<(&str, &str)> {
        fields.iter().collect()
    }

    #[test]
    fn test_mixed_pattern() {
        let fields = extract("$name$_$date%8$_v$ver$", "MyExp_20260121_v2");
        assert_eq!(
            pairs(&fields),
            vec![("name", "MyExp"), ("date", "20260121"), ("ver", "2")]
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert!(extract("", "anything").is_empty());
        assert!(extract("$a$", "").is_empty());
        assert!(extract("plain_name", "plain_name").is_empty());
    }

    #[test]
    fn test_fixed_width() {
        assert_eq!(pairs(&extract("$a%3$", "abc")), vec![("a", "abc")]);
        assert!(extract("$a%3$", "abcd").is_empty());
        assert_eq!(pairs(&extract("$a%3$_end", "abc_end")), vec![("a", "abc")]);
        assert!(extract("$a%3$_end", "abcd_end").is_empty());
    }

    #[test]
    fn test_variable_needs_a_character() {
        assert!(extract("$a$$b$", "x").is_empty());
        assert_eq!(pairs(&extract("$a$$b$", "xyz")), vec![("a", "x"), ("b", "yz")]);
    }

    #[test]
    fn test_lazy_match_takes_first_split() {
        let fields = extract("$left$_$right$", "a_b_c");
        assert_eq!(pairs(&fields), vec![("left", "a"), ("right", "b_c")]);
    }

    #[test]
    fn test_literals_are_escaped() {
        let fields = extract("run.$id$(final)", "run.42(final)");
        assert_eq!(pairs(&fields), vec![("id", "42")]);
        assert!(extract("run.$id$(final)", "runX42(final)").is_empty());
    }

    #[test]
    fn test_match_is_anchored() {
        assert!(extract("exp_$id%2$", "exp_123").is_empty());
        assert!(extract("exp_$id%2$", "my_exp_12").is_empty());
    }

    #[test]
    fn test_stray_delimiters_are_literal() {
        assert_eq!(
            pairs(&extract("$item$ costs 5$", "bolt costs 5$")),
            vec![("item", "bolt")]
        );
        assert_eq!(
            tokenize("$a%x$").unwrap(),
            vec![Segment::Literal("$a%x$".to_string())]
        );
    }

    #[test]
    fn test_names_with_spaces() {
        let fields = extract("$sample id$-$run$", "S12-7");
        assert_eq!(fields.get("sample id"), Some("S12"));
        assert_eq!(fields.get("run"), Some("7"));
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(
            FolderPattern::compile("no placeholders").unwrap_err(),
            PatternError::NoPlaceholders
        );
        assert_eq!(
            FolderPattern::compile("$a$_$a$").unwrap_err(),
            PatternError::DuplicateName("a".to_string())
        );
        assert!(matches!(
            FolderPattern::compile("$a%99999999999999999999999$"),
            Err(PatternError::InvalidWidth(_))
        ));
        assert!(matches!(
            FolderPattern::compile("$a%999999999$"),
            Err(PatternError::InvalidExpression(_))
        ));
        assert!(extract("$a$_$a$", "x_y").is_empty());
    }

    #[test]
    fn test_render_round_trip() {
        let cases = [
            ("$name$_$date%8$_v$ver$", "MyExp_20260121_v2"),
            ("[$site$] $day%2$-$month%2$", "[lab 3] 01-12"),
            ("$a$.$b$.$c$", "1.2.3.4"),
        ];
        for (template, subject) in cases {
            let pattern = FolderPattern::compile(template).unwrap();
            let fields = pattern.extract(subject);
            assert!(!fields.is_empty(), "{template} should match {subject}");
            assert_eq!(pattern.render(&fields).as_deref(), Some(subject));
        }
    }

    #[test]
    fn test_cache_matches_free_function() {
        let mut cache = PatternCache::new();
        let template = "$name$_$date%8$";
        assert_eq!(
            cache.extract(template, "Exp_20250101"),
            extract(template, "Exp_20250101")
        );
        assert_eq!(cache.len(), 1);
        cache.extract(template, "Other_20250102");
        assert_eq!(cache.len(), 1);
        assert!(cache.extract("$a$_$a$", "x_y").is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_serializes_in_pattern_order() {
        let fields = extract("$z$-$a$", "last-first");
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"z":"last","a":"first"}"#);
    }
}
