use std::collections::HashSet;

use serde::Serialize;

use crate::parser::PageResult;

/// Texts already emitted by earlier pages, one set per language.
#[derive(Debug, Default)]
pub struct SeenTexts {
    english: HashSet<String>,
    khmer: HashSet<String>,
}

impl SeenTexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip already-seen texts from `page`, recording the survivors.
    /// Returns `None` when nothing unique is left.
    pub fn dedup_page(&mut self, page: PageResult) -> Option<PageResult> {
        let english_blocks = keep_unseen(&mut self.english, page.english_blocks);
        let khmer_blocks = keep_unseen(&mut self.khmer, page.khmer_blocks);

        if english_blocks.is_empty() && khmer_blocks.is_empty() {
            return None;
        }
        Some(PageResult {
            english_blocks,
            khmer_blocks,
            ..page
        })
    }
}

fn keep_unseen(seen: &mut HashSet<String>, texts: Vec<String>) -> Vec<String> {
    texts
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Pages after run-wide deduplication, in the order they were aggregated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateResult {
    pub pages: Vec<PageResult>,
}

/// One output row: exactly one of the two text fields is non-empty.
/// `url` names the source page; it is stored in the database but not in the CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BilingualRow {
    #[serde(rename = "ID")]
    pub id: usize,
    #[serde(skip)]
    pub url: String,
    #[serde(rename = "English_Text")]
    pub english_text: String,
    #[serde(rename = "Khmer_Text")]
    pub khmer_text: String,
}

/// Deduplicate texts across the whole run. Runs after every fetch task has
/// joined, so the seen-sets are owned here and never shared.
pub fn aggregate(pages: impl IntoIterator<Item = PageResult>) -> AggregateResult {
    let mut seen = SeenTexts::new();
    let pages = pages
        .into_iter()
        .filter_map(|page| seen.dedup_page(page))
        .collect();
    AggregateResult { pages }
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Flatten to rows numbered from 1; per page, English rows precede Khmer rows.
    pub fn to_rows(&self) -> Vec<BilingualRow> {
        let texts = self.pages.iter().flat_map(|p| {
            p.english_blocks
                .iter()
                .map(move |t| (&p.url, t.clone(), String::new()))
                .chain(p.khmer_blocks.iter().map(move |t| (&p.url, String::new(), t.clone())))
        });
        texts
            .enumerate()
            .map(|(i, (url, english_text, khmer_text))| BilingualRow {
                id: i + 1,
                url: url.clone(),
                english_text,
                khmer_text,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PageStatus;

    fn page(url: &str, en: &[&str], km: &[&str]) -> PageResult {
        PageResult {
            url: url.to_string(),
            status: PageStatus::Success,
            english_blocks: en.iter().map(|s| s.to_string()).collect(),
            khmer_blocks: km.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn first_page_wins_shared_text() {
        let result = aggregate(vec![
            page("a", &["Welcome to AUPP", "About us"], &[]),
            page("b", &["Welcome to AUPP", "Contact"], &[]),
        ]);
        assert_eq!(result.pages[0].english_blocks, vec!["Welcome to AUPP", "About us"]);
        assert_eq!(result.pages[1].english_blocks, vec!["Contact"]);
        let count = result
            .pages
            .iter()
            .flat_map(|p| &p.english_blocks)
            .filter(|t| *t == "Welcome to AUPP")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn languages_dedup_independently() {
        let result = aggregate(vec![page("a", &["same"], &["same"])]);
        assert_eq!(result.pages[0].english_blocks, vec!["same"]);
        assert_eq!(result.pages[0].khmer_blocks, vec!["same"]);
    }

    #[test]
    fn within_page_repeats_collapse() {
        let result = aggregate(vec![page("a", &["x1", "x2", "x1"], &[])]);
        assert_eq!(result.pages[0].english_blocks, vec!["x1", "x2"]);
    }

    #[test]
    fn pages_with_nothing_unique_are_dropped() {
        let result = aggregate(vec![
            page("a", &["one"], &["ពីរ"]),
            page("b", &["one"], &["ពីរ"]),
            page("c", &[], &[]),
        ]);
        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.pages[0].url, "a");
    }

    #[test]
    fn no_text_repeats_across_buckets() {
        let result = aggregate(vec![
            page("a", &["p", "q"], &["k1"]),
            page("b", &["q", "r", "p"], &["k1", "k2"]),
            page("c", &["r", "s"], &["k2", "k3"]),
        ]);
        let mut en = HashSet::new();
        let mut km = HashSet::new();
        for p in &result.pages {
            for t in &p.english_blocks {
                assert!(en.insert(t.clone()), "duplicate english {}", t);
            }
            for t in &p.khmer_blocks {
                assert!(km.insert(t.clone()), "duplicate khmer {}", t);
            }
        }
        assert_eq!(en.len(), 4);
        assert_eq!(km.len(), 3);
    }

    #[test]
    fn rows_number_from_one_english_first() {
        let result = aggregate(vec![page("a", &["e1"], &["k1"]), page("b", &["e2"], &[])]);
        let rows = result.to_rows();
        assert_eq!(
            rows,
            vec![
                BilingualRow { id: 1, url: "a".into(), english_text: "e1".into(), khmer_text: String::new() },
                BilingualRow { id: 2, url: "a".into(), english_text: String::new(), khmer_text: "k1".into() },
                BilingualRow { id: 3, url: "b".into(), english_text: "e2".into(), khmer_text: String::new() },
            ]
        );
    }

    #[test]
    fn empty_input() {
        let result = aggregate(Vec::new());
        assert!(result.is_empty());
        assert!(result.to_rows().is_empty());
    }
}
