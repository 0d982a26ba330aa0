//! Basic tokenizer for the reference index
//!
//! No stemming and no stopwords: terms are lowercase alphanumeric runs.

use scribe_core::Document;

/// Tokenize text into searchable terms
///
/// - Lowercase
/// - Split on non-alphanumeric characters
/// - Filter tokens shorter than 2 characters
///
/// # Example
///
/// ```
/// use scribe_search::tokenizer::tokenize;
///
/// let tokens = tokenize("Hello, World!");
/// assert_eq!(tokens, vec!["hello", "world"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() >= 2)
        .map(String::from)
        .collect()
}

/// Tokenize and deduplicate, keeping first-seen order
///
/// Used for queries, where repeating a term must not boost it.
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Terms of every text field of `doc`
///
/// The resolver bookkeeping field is not searchable.
pub fn document_terms(doc: &Document) -> Vec<String> {
    doc.text().flat_map(tokenize).collect()
}
