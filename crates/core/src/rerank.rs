use crate::models::SearchResult;

pub const RERANK_LIMIT: usize = 5;

const MIN_KEYWORD_CHARS: usize = 4;
const PREFIX_CHARS: usize = 4;

/// Second-pass ranking for conversational answers.
///
/// Each result is re-scored against its first snippet and its title:
/// `2 * exact + partial + position`, where `exact` counts keywords present
/// in either, `partial` counts keywords whose four-character prefix is
/// present, and `position` adds `1 / (1 + index)` for the first occurrence
/// of every keyword, separately in snippet and title. The composite replaces
/// `score`.
pub fn rerank(results: Vec<SearchResult>, query: &str) -> Vec<SearchResult> {
    let keywords = keywords(query);

    let mut scored = results
        .into_iter()
        .map(|mut result| {
            result.score = composite_score(&result, &keywords);
            result
        })
        .collect::<Vec<_>>();

    scored.sort_by(|left, right| right.score.total_cmp(&left.score));
    scored.truncate(RERANK_LIMIT);
    scored
}

fn keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() >= MIN_KEYWORD_CHARS)
        .collect()
}

fn composite_score(result: &SearchResult, keywords: &[String]) -> f64 {
    let content = result
        .contexts
        .first()
        .map(|context| context.to_lowercase())
        .unwrap_or_default();
    let title = result
        .title
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();

    let mut exact = 0usize;
    let mut partial = 0usize;
    let mut position = 0.0;

    for keyword in keywords {
        if content.contains(keyword.as_str()) || title.contains(keyword.as_str()) {
            exact += 1;
        }

        let prefix = keyword.chars().take(PREFIX_CHARS).collect::<String>();
        if content.contains(&prefix) || title.contains(&prefix) {
            partial += 1;
        }

        position += position_weight(&content, keyword) + position_weight(&title, keyword);
    }

    2.0 * exact as f64 + partial as f64 + position
}

fn position_weight(haystack: &str, keyword: &str) -> f64 {
    haystack
        .find(keyword)
        .map(|offset| 1.0 / (1.0 + haystack[..offset].chars().count() as f64))
        .unwrap_or(0.0)
}
