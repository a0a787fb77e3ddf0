pub mod blocks;
pub mod dom;
pub mod language;
pub mod normalize;
pub mod tables;

use serde::Serialize;

use blocks::BilingualText;
use dom::Document;
use language::{Classifier, LanguageDetector};
use tables::TableRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Success,
    Failed,
}

/// Bilingual text extracted from one fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    pub url: String,
    pub status: PageStatus,
    pub english_blocks: Vec<String>,
    pub khmer_blocks: Vec<String>,
}

/// Everything one page yields: its text buckets and its tables.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub page: PageResult,
    pub tables: Vec<TableRecord>,
}

/// markup → pruned document → (text blocks, tables).
pub fn process_page<D: LanguageDetector>(
    url: &str,
    markup: &str,
    classifier: &Classifier<D>,
) -> PageExtraction {
    let doc = Document::parse_content(markup);
    let BilingualText { english, khmer } = blocks::extract_text(&doc, classifier);
    let tables = tables::extract_tables(&doc);

    PageExtraction {
        page: PageResult {
            url: url.to_string(),
            status: PageStatus::Success,
            english_blocks: english,
            khmer_blocks: khmer,
        },
        tables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_page_collects_text_and_tables() {
        let html = r#"<html><body>
            <header><p>Top navigation menu</p></header>
            <h1>The American University of Phnom Penh</h1>
            <p>សាកលវិទ្យាល័យអាមេរិកាំងភ្នំពេញ</p>
            <h2>Required Courses</h2>
            <table><tr><th>Course</th><th>Credits</th></tr><tr><td>Math101</td><td>3</td></tr></table>
        </body></html>"#;

        let out = process_page("https://www.aupp.edu.kh/x", html, &Classifier::default());
        assert_eq!(out.page.status, PageStatus::Success);
        assert_eq!(out.page.url, "https://www.aupp.edu.kh/x");
        assert!(out.page.khmer_blocks.contains(&"សាកលវិទ្យាល័យអាមេរិកាំងភ្នំពេញ".to_string()));
        assert!(!out.page.english_blocks.iter().any(|t| t.contains("navigation")));
        assert_eq!(out.tables.len(), 1);
        assert_eq!(out.tables[0].rows, vec![vec!["Math101", "3"]]);
    }
}
