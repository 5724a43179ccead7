//! Text search over a page's text layer
//!
//! Matches are reported in hit-unit index space so that a hit can be turned
//! into highlight regions with [`selection_regions`](crate::geometry::selection_regions).

use crate::geometry::SelectionRange;
use crate::text_layer::PageTextLayer;

/// Case-insensitive, non-overlapping matches of `query` on one page.
///
/// An empty query matches nothing.
pub fn find_matches(layer: &PageTextLayer, query: &str) -> Vec<SelectionRange> {
    let haystack: Vec<char> = layer.text().chars().collect();
    find_in_chars(&haystack, query)
}

/// One match in a multi-page search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub page_index: u32,
    pub range: SelectionRange,
}

/// Matches across a document with a wrapping cursor.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    hits: Vec<SearchHit>,
    current: Option<usize>,
}

impl SearchResults {
    /// Search every layer in page order. The cursor starts on the first hit.
    pub fn search<'a>(layers: impl IntoIterator<Item = &'a PageTextLayer>, query: &str) -> Self {
        let hits: Vec<SearchHit> = layers
            .into_iter()
            .flat_map(|layer| {
                find_matches(layer, query)
                    .into_iter()
                    .map(move |range| SearchHit { page_index: layer.page_index, range })
            })
            .collect();
        let current = if hits.is_empty() { None } else { Some(0) };
        Self { hits, current }
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn current(&self) -> Option<SearchHit> {
        self.current.map(|index| self.hits[index])
    }

    /// Move to the next hit, wrapping to the first.
    pub fn next_hit(&mut self) -> Option<SearchHit> {
        let len = self.hits.len();
        self.current = self.current.map(|index| (index + 1) % len);
        self.current()
    }

    /// Move to the previous hit, wrapping to the last.
    pub fn prev_hit(&mut self) -> Option<SearchHit> {
        let len = self.hits.len();
        self.current = self.current.map(|index| (index + len - 1) % len);
        self.current()
    }
}

fn find_in_chars(haystack: &[char], query: &str) -> Vec<SelectionRange> {
    let needle: Vec<char> = query.chars().collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        let window = &haystack[start..start + needle.len()];
        if window.iter().zip(&needle).all(|(a, b)| same_char_ignoring_case(*a, *b)) {
            matches.push(SelectionRange::new(start, start + needle.len() - 1));
            start += needle.len();
        } else {
            start += 1;
        }
    }

    log::debug!("query {:?} matched {} times", query, matches.len());
    matches
}

fn same_char_ignoring_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_layer::TextRun;
    use doc_model::Rect;

    fn layer(text: &str) -> PageTextLayer {
        PageTextLayer::from_runs(0, vec![TextRun::new(text, Rect::new(0.0, 0.0, 100.0, 10.0))])
    }

    #[test]
    fn test_matches_ignore_case() {
        let matches = find_matches(&layer("Rust and rust and RUST"), "rust");
        assert_eq!(
            matches,
            vec![SelectionRange::new(0, 3), SelectionRange::new(9, 12), SelectionRange::new(18, 21)]
        );
    }

    #[test]
    fn test_matches_do_not_overlap() {
        let matches = find_matches(&layer("aaaa"), "aa");
        assert_eq!(matches, vec![SelectionRange::new(0, 1), SelectionRange::new(2, 3)]);
    }

    #[test]
    fn test_matches_span_runs() {
        let layer = PageTextLayer::from_runs(
            0,
            vec![
                TextRun::new("Straße ", Rect::new(0.0, 0.0, 70.0, 10.0)),
                TextRun::new("ÉCOLE", Rect::new(70.0, 0.0, 120.0, 10.0)),
            ],
        );
        assert_eq!(find_matches(&layer, "e école"), vec![SelectionRange::new(5, 11)]);
    }

    #[test]
    fn test_results_cursor_wraps_across_pages() {
        let first = layer("one two one");
        let mut second = layer("ONE");
        second.page_index = 4;

        let mut results = SearchResults::search([&first, &second], "one");

        assert_eq!(results.len(), 3);
        assert_eq!(
            results.current(),
            Some(SearchHit { page_index: 0, range: SelectionRange::new(0, 2) })
        );
        assert_eq!(results.prev_hit().map(|hit| hit.page_index), Some(4));
        assert_eq!(results.next_hit().map(|hit| hit.range), Some(SelectionRange::new(0, 2)));
        assert_eq!(results.next_hit().map(|hit| hit.range), Some(SelectionRange::new(8, 10)));
    }

    #[test]
    fn test_no_results_has_no_cursor() {
        let mut results = SearchResults::search([&layer("text")], "zzz");
        assert!(results.is_empty());
        assert_eq!(results.current(), None);
        assert_eq!(results.next_hit(), None);
        assert_eq!(results.prev_hit(), None);
    }

    #[test]
    fn test_empty_or_long_query_matches_nothing() {
        assert!(find_matches(&layer("text"), "").is_empty());
        assert!(find_matches(&layer("text"), "texts").is_empty());
        assert!(find_matches(&layer(""), "a").is_empty());
    }
}
