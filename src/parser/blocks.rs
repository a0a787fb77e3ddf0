use std::sync::LazyLock;

use scraper::Selector;

use super::dom::{flatten_text, Document};
use super::language::{is_noise, Classification, Classifier, LanguageDetector};
use super::normalize::normalize;

static POST_INFO_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".elementor-post-info").unwrap());
static TIME_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("time").unwrap());
static CATEGORY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.elementor-post-info__terms-list-item").unwrap());
static NESTED_ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

/// Extraction passes, run in this order over the whole document.
static RULES: LazyLock<Vec<(SourceTag, Selector)>> = LazyLock::new(|| {
    [
        (SourceTag::Heading, "h1, h2, h3, h4, h5, h6"),
        (SourceTag::Paragraph, "p"),
        (SourceTag::ListItem, "li"),
        (SourceTag::TableCell, "th, td"),
    ]
    .into_iter()
    .map(|(tag, css)| (tag, Selector::parse(css).unwrap()))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    Heading,
    Paragraph,
    ListItem,
    TableCell,
    /// Publication date and category line of a post.
    PostInfo,
}

/// Text pulled from one markup element, not yet cleaned or classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub raw_text: String,
    pub source: SourceTag,
}

/// Per-page language buckets, in extraction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BilingualText {
    pub english: Vec<String>,
    pub khmer: Vec<String>,
}

impl BilingualText {
    fn push(&mut self, class: Classification, text: String) {
        match class {
            Classification::English => self.english.push(text),
            Classification::Khmer => self.khmer.push(text),
            Classification::Unknown => {}
        }
    }
}

/// Build "Published on {date} in {category}" from the post metadata container.
pub fn extract_post_info(doc: &Document) -> Option<String> {
    let container = doc.find(&POST_INFO_SEL)?;

    let date = container
        .select(&TIME_SEL)
        .next()
        .map(|el| flatten_text(el, ""))
        .unwrap_or_default();
    let category = container
        .select(&CATEGORY_SEL)
        .next()
        .map(|el| flatten_text(el, ""))
        .unwrap_or_default();

    let mut info = String::new();
    if !date.is_empty() {
        info.push_str("Published on ");
        info.push_str(&date);
    }
    if !category.is_empty() {
        info.push_str(" in ");
        info.push_str(&category);
    }

    let info = info.trim();
    if info.is_empty() {
        None
    } else {
        Some(info.to_string())
    }
}

/// Content blocks in rule order: headings, paragraphs, list items, table cells.
///
/// A cell that embeds its own rows contributes one block per nested row
/// instead of its own text.
pub fn extract_blocks(doc: &Document) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    for (source, selector) in RULES.iter() {
        for el in doc.select(selector) {
            if *source == SourceTag::TableCell {
                let nested: Vec<_> = el.select(&NESTED_ROW_SEL).collect();
                if !nested.is_empty() {
                    blocks.extend(nested.into_iter().map(|tr| TextBlock {
                        raw_text: flatten_text(tr, " "),
                        source: *source,
                    }));
                    continue;
                }
            }
            blocks.push(TextBlock {
                raw_text: flatten_text(el, " "),
                source: *source,
            });
        }
    }
    blocks
}

/// Run the full block pipeline for one page: post-info fragment first, then
/// every content block through noise filter, normalizer and classifier.
pub fn extract_text<D: LanguageDetector>(doc: &Document, classifier: &Classifier<D>) -> BilingualText {
    let mut text = BilingualText::default();

    let post_info = extract_post_info(doc).map(|raw_text| TextBlock {
        raw_text,
        source: SourceTag::PostInfo,
    });

    for block in post_info.into_iter().chain(extract_blocks(doc)) {
        // Built from trimmed fragments already; other languages are not coerced.
        if block.source == SourceTag::PostInfo {
            let class = classifier.classify_strict(&block.raw_text);
            text.push(class, block.raw_text);
            continue;
        }
        if is_noise(&block.raw_text) {
            continue;
        }
        let cleaned = normalize(&block.raw_text);
        if cleaned.is_empty() {
            continue;
        }
        let class = classifier.classify(&cleaned);
        text.push(class, cleaned);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::language::Detection;

    struct AlwaysEnglish;

    impl LanguageDetector for AlwaysEnglish {
        fn detect(&self, _text: &str) -> Detection {
            Detection::English
        }
    }

    fn doc(html: &str) -> Document {
        Document::parse_content(html)
    }

    #[test]
    fn blocks_follow_rule_order() {
        let d = doc("<p>Paragraph one</p><h2>Heading two</h2><ul><li>List item</li></ul><h1>Heading one</h1>");
        let blocks = extract_blocks(&d);
        let got: Vec<(&str, SourceTag)> = blocks.iter().map(|b| (b.raw_text.as_str(), b.source)).collect();
        assert_eq!(
            got,
            vec![
                ("Heading two", SourceTag::Heading),
                ("Heading one", SourceTag::Heading),
                ("Paragraph one", SourceTag::Paragraph),
                ("List item", SourceTag::ListItem),
            ]
        );
    }

    #[test]
    fn nested_rows_replace_outer_cell() {
        let d = doc(
            "<table><tr><td>Outer label\
               <table><tr><td>Inner A</td><td>one</td></tr><tr><td>Inner B</td><td>two</td></tr></table>\
             </td></tr></table>",
        );
        let cells: Vec<String> = extract_blocks(&d)
            .into_iter()
            .filter(|b| b.source == SourceTag::TableCell)
            .map(|b| b.raw_text)
            .collect();
        // outer cell -> its two nested rows; then the four inner cells themselves
        assert_eq!(
            cells,
            vec!["Inner A one", "Inner B two", "Inner A", "one", "Inner B", "two"]
        );
        assert!(!cells.iter().any(|c| c.contains("Outer label")));
    }

    #[test]
    fn header_cells_with_nested_rows_also_expand() {
        let d = doc("<table><tr><th><table><tr><td>Nested heading row</td></tr></table></th></tr></table>");
        let cells: Vec<String> = extract_blocks(&d)
            .into_iter()
            .filter(|b| b.source == SourceTag::TableCell)
            .map(|b| b.raw_text)
            .collect();
        assert_eq!(cells[0], "Nested heading row");
    }

    #[test]
    fn post_info_full_and_partial() {
        let full = doc(
            r#"<div class="elementor-post-info">
                 <time>March 3, 2024</time>
                 <span class="elementor-post-info__terms-list-item">News</span>
               </div>"#,
        );
        assert_eq!(extract_post_info(&full).as_deref(), Some("Published on March 3, 2024 in News"));

        let date_only = doc(r#"<div class="elementor-post-info"><time>March 3, 2024</time></div>"#);
        assert_eq!(extract_post_info(&date_only).as_deref(), Some("Published on March 3, 2024"));

        let cat_only = doc(
            r#"<div class="elementor-post-info"><span class="elementor-post-info__terms-list-item">Events</span></div>"#,
        );
        assert_eq!(extract_post_info(&cat_only).as_deref(), Some("in Events"));

        let empty = doc(r#"<div class="elementor-post-info"><span>nothing</span></div>"#);
        assert_eq!(extract_post_info(&empty), None);
        assert_eq!(extract_post_info(&doc("<p>no container</p>")), None);
    }

    #[test]
    fn pipeline_filters_noise_and_routes_languages() {
        let d = doc(
            "<header><h1>Site navigation header</h1></header>\
             <h1>Admissions   2020–2021</h1>\
             <p>Short</p>\
             <p>សាកលវិទ្យាល័យអាមេរិកាំងភ្នំពេញ</p>\
             <div data-elementor-type=\"footer\"><p>Footer copyright text</p></div>",
        );
        let text = extract_text(&d, &Classifier::new(AlwaysEnglish));
        assert_eq!(text.english, vec!["Admissions 20202021"]);
        assert_eq!(text.khmer, vec!["សាកលវិទ្យាល័យអាមេរិកាំងភ្នំពេញ"]);
    }

    #[test]
    fn post_info_comes_first() {
        let d = doc(
            r#"<div class="elementor-post-info"><time>May 1, 2024</time></div>
               <p>Welcome to the new semester</p>"#,
        );
        let text = extract_text(&d, &Classifier::new(AlwaysEnglish));
        assert_eq!(text.english, vec!["Published on May 1, 2024", "Welcome to the new semester"]);
    }

    #[test]
    fn post_info_skips_coercion_of_other_languages() {
        struct AlwaysFrench;

        impl LanguageDetector for AlwaysFrench {
            fn detect(&self, _text: &str) -> Detection {
                Detection::Other("fra")
            }
        }

        let d = doc(
            r#"<div class="elementor-post-info"><time>1 mai 2024</time></div>
               <p>Bienvenue au nouveau semestre</p>"#,
        );
        let text = extract_text(&d, &Classifier::new(AlwaysFrench));
        assert_eq!(text.english, vec!["Bienvenue au nouveau semestre"]);
        assert!(text.khmer.is_empty());
    }

    #[test]
    fn within_page_repeats_are_kept() {
        let d = doc("<p>Welcome to AUPP</p><li>Welcome to AUPP</li>");
        let text = extract_text(&d, &Classifier::new(AlwaysEnglish));
        assert_eq!(text.english.len(), 2);
    }
}
