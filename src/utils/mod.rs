//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod url;

use unicode_segmentation::UnicodeSegmentation;

/// Lowercase word tokens of `text`, punctuation dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase alphanumeric runs joined by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Sr. ML Engineer (Applied AI)"),
            vec!["sr", "ml", "engineer", "applied", "ai"]
        );
        assert!(tokenize("  ").is_empty());
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("  Machine\n Learning\tEngineer "),
            "Machine Learning Engineer"
        );
    }
}
