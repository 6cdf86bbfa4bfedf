use crate::models::{Document, Page, SearchOptions, SearchResult};
use std::borrow::Borrow;
use tracing::debug;

pub fn search<D: Borrow<Document>>(corpus: &[D], query: &str) -> Vec<SearchResult> {
    search_with(corpus, query, &SearchOptions::default())
}

/// Scores every page of the corpus against the whitespace-separated terms
/// of `query`. Terms are matched as case-insensitive literal substrings, so
/// a term inside a longer word still counts.
pub fn search_with<D: Borrow<Document>>(
    corpus: &[D],
    query: &str,
    options: &SearchOptions,
) -> Vec<SearchResult> {
    let terms = query_terms(query, options.min_term_chars);
    if terms.is_empty() || corpus.is_empty() {
        return Vec::new();
    }

    let mut results = Vec::new();
    for document in corpus {
        let document: &Document = document.borrow();
        for page in &document.text_content {
            if let Some(result) = score_page(document, page, &terms, options) {
                results.push(result);
            }
        }
    }

    results.sort_by(|left, right| right.score.total_cmp(&left.score));
    results.truncate(options.max_results);
    debug!(query, results = results.len(), "search finished");
    results
}

pub fn query_terms(query: &str, min_chars: usize) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|term| term.chars().count() >= min_chars)
        .collect()
}

fn score_page(
    document: &Document,
    page: &Page,
    terms: &[String],
    options: &SearchOptions,
) -> Option<SearchResult> {
    let lowered = LoweredText::new(&page.text);
    let positions = terms
        .iter()
        .flat_map(|term| lowered.occurrences(term))
        .collect::<Vec<_>>();

    if positions.is_empty() {
        return None;
    }

    let chars = page.text.chars().collect::<Vec<_>>();
    let contexts = positions
        .iter()
        .map(|&position| snippet(&chars, position, options.context_radius))
        .collect();

    Some(SearchResult {
        file_name: document.display_name.clone(),
        document_name: document.name.clone(),
        page: page.page,
        contexts,
        score: positions.len() as f64 / terms.len() as f64,
        matches: positions.len(),
        category: document.category.clone(),
        url: document.url.clone(),
        title: Some(document.title.clone()),
    })
}

/// Lower-cased copy of a text that remembers, for every lower-cased
/// character, the index of the character it came from. Lower-casing can
/// expand a single character, so byte offsets do not line up otherwise.
struct LoweredText {
    text: String,
    origins: Vec<(usize, usize)>,
}

impl LoweredText {
    fn new(original: &str) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut origins = Vec::with_capacity(original.len());

        for (index, character) in original.chars().enumerate() {
            for lowered in character.to_lowercase() {
                origins.push((text.len(), index));
                text.push(lowered);
            }
        }

        Self { text, origins }
    }

    /// Non-overlapping occurrences of `term`, as character offsets into the
    /// original text.
    fn occurrences(&self, term: &str) -> Vec<usize> {
        self.text
            .match_indices(term)
            .filter_map(|(offset, _)| self.original_index(offset))
            .collect()
    }

    fn original_index(&self, byte_offset: usize) -> Option<usize> {
        self.origins
            .binary_search_by_key(&byte_offset, |&(offset, _)| offset)
            .ok()
            .map(|slot| self.origins[slot].1)
    }
}

fn snippet(chars: &[char], position: usize, radius: usize) -> String {
    let start = position.saturating_sub(radius);
    let end = (position + radius).min(chars.len());

    let mut context = chars[start.min(end)..end].iter().collect::<String>();
    if start > 0 {
        context.insert_str(0, "...");
    }
    if end < chars.len() {
        context.push_str("...");
    }
    context
}
