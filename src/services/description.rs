// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key/value metadata extraction from activity descriptions.
//!
//! Strava descriptions may embed structured lines like `bike = Roadie`
//! alongside free text. Each line either contributes one key/value pair or
//! is folded back into the residual description; a line that fails the
//! pattern is plain text, never an error.

/// Result of extracting metadata from a description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// Remaining free text, newline-joined. `None` when every line matched
    /// the key/value pattern (or the input was empty).
    pub residual: Option<String>,
    /// Discovered pairs, in line order.
    pub pairs: Vec<(String, String)>,
}

/// Extract key/value pairs from a free-text description.
///
/// A line matches when it starts with a contiguous token containing no
/// whitespace and no `=`, followed by optional whitespace, a single `=`,
/// optional whitespace, and the remainder as the value. Pure function: the
/// caller merges the result into the activity.
pub fn extract(raw: &str) -> Extraction {
    if raw.trim().is_empty() {
        return Extraction::default();
    }

    let mut pairs = Vec::new();
    let mut residual_lines = Vec::new();

    for line in raw.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        match match_key_value(line) {
            Some((key, value)) => pairs.push((key.to_string(), value.to_string())),
            None => residual_lines.push(line),
        }
    }

    let residual = if residual_lines.is_empty() {
        None
    } else {
        Some(residual_lines.join("\n"))
    };

    Extraction { residual, pairs }
}

/// Match one line against the `key = value` pattern.
fn match_key_value(line: &str) -> Option<(&str, &str)> {
    let eq = line.find('=')?;
    let key = line[..eq].trim_end();
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return None;
    }
    let value = line[eq + 1..].trim_start();
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_description() {
        let result = extract("shoes = Speedster\nGreat climb today");
        assert_eq!(
            result.pairs,
            vec![("shoes".to_string(), "Speedster".to_string())]
        );
        assert_eq!(result.residual.as_deref(), Some("Great climb today"));
    }

    #[test]
    fn test_all_lines_match_leaves_no_residual() {
        let result = extract("bike = Roadie\nshoes=Speedster\nwheels  =  Carbon 50");
        assert_eq!(result.residual, None);
        assert_eq!(
            result.pairs,
            vec![
                ("bike".to_string(), "Roadie".to_string()),
                ("shoes".to_string(), "Speedster".to_string()),
                ("wheels".to_string(), "Carbon 50".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_matching_lines_preserves_text() {
        let text = "Great ride!\nPerfect weather.";
        let result = extract(text);
        assert!(result.pairs.is_empty());
        assert_eq!(result.residual.as_deref(), Some(text));
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert_eq!(extract(""), Extraction::default());
        assert_eq!(extract("   \n  \t "), Extraction::default());
    }

    #[test]
    fn test_crlf_line_breaks() {
        let result = extract("bike = Roadie\r\nNice day out");
        assert_eq!(
            result.pairs,
            vec![("bike".to_string(), "Roadie".to_string())]
        );
        assert_eq!(result.residual.as_deref(), Some("Nice day out"));
    }

    #[test]
    fn test_key_with_whitespace_does_not_match() {
        let result = extract("my bike = Roadie");
        assert!(result.pairs.is_empty());
        assert_eq!(result.residual.as_deref(), Some("my bike = Roadie"));
    }

    #[test]
    fn test_value_keeps_later_equals_signs() {
        let result = extract("note = a = b");
        assert_eq!(result.pairs, vec![("note".to_string(), "a = b".to_string())]);
    }

    #[test]
    fn test_empty_value_matches() {
        let result = extract("bike =");
        assert_eq!(result.pairs, vec![("bike".to_string(), String::new())]);
        assert_eq!(result.residual, None);
    }

    #[test]
    fn test_pair_order_follows_line_order() {
        let result = extract("b = 2\na = 1\nc = 3");
        let keys: Vec<&str> = result.pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }
}
