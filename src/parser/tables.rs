use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use super::dom::{flatten_text, Document};

static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static P_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

const TITLE_TAGS: &[&str] = &["h1", "h2", "h3", "div", "button", "span"];
const TITLE_KEYWORDS: &[&str] = &["Required", "Courses"];
const DETAIL_TAGS: &[&str] = &["p", "small", "h4", "h5", "h6"];

/// One table from a page, normalized to a header row plus equal-width rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    pub title: String,
    pub detail: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn is_title_candidate(el: &ElementRef<'_>) -> bool {
    if !TITLE_TAGS.contains(&el.value().name()) {
        return false;
    }
    let text: String = el.text().collect();
    TITLE_KEYWORDS.iter().any(|kw| text.contains(kw))
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Header cells and data rows of a single table, widened so every row has
/// exactly `headers.len()` cells. `None` when the table has no non-empty row.
fn table_grid(table: ElementRef<'_>) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let mut headers: Vec<String> = table.select(&TH_SEL).map(|th| flatten_text(th, "")).collect();

    let mut rows: Vec<Vec<String>> = table
        .select(&TR_SEL)
        .map(|tr| tr.select(&TD_SEL).map(|td| flatten_text(td, "")).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    if rows.is_empty() {
        return None;
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(headers.len());
    for i in headers.len()..width {
        headers.push(format!("Column {}", i + 1));
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }

    Some((headers, rows))
}

/// Every table in document order that has at least one non-empty row.
///
/// Each table gets the nearest preceding keyword heading as its title and the
/// nearest preceding small-text element as its detail. The first table's
/// title sits in the detail position on these pages, so it is shifted up and
/// the page's first paragraph becomes its detail.
pub fn extract_tables(doc: &Document) -> Vec<TableRecord> {
    let elements = doc.elements();
    let mut records = Vec::new();

    let tables = elements
        .iter()
        .enumerate()
        .filter(|(_, el)| el.value().name() == "table");

    for (index, (pos, table)) in tables.enumerate() {
        let Some((headers, rows)) = table_grid(*table) else {
            continue;
        };

        let preceding = &elements[..pos];
        let title_el = preceding.iter().rev().find(|el| is_title_candidate(el));
        let title = title_el
            .map(|el| flatten_text(*el, ""))
            .unwrap_or_else(|| format!("Table {}", index + 1));

        let title_id = title_el.map(|el| el.id());
        let detail = preceding
            .iter()
            .rev()
            .find(|el| DETAIL_TAGS.contains(&el.value().name()) && Some(el.id()) != title_id)
            .and_then(|el| non_empty(flatten_text(*el, "")));

        records.push(TableRecord {
            title,
            detail,
            headers,
            rows,
        });
    }

    if let Some(first) = records.first_mut() {
        if let Some(detail) = first.detail.take() {
            first.title = detail;
        }
        first.detail = doc.find(&P_SEL).and_then(|p| non_empty(flatten_text(p, "")));
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(html: &str) -> Vec<TableRecord> {
        extract_tables(&Document::parse_content(html))
    }

    #[test]
    fn first_table_swaps_title_and_detail() {
        let t = tables(
            "<p>Intro to the program catalogue</p>\
             <h2>Required Courses</h2>\
             <h4>Fall semester</h4>\
             <table>\
               <tr><th>Course</th><th>Credits</th></tr>\
               <tr><td>Math101</td><td>3</td></tr>\
               <tr><td>Eng101</td><td>3</td></tr>\
             </table>",
        );
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].headers, vec!["Course", "Credits"]);
        assert_eq!(t[0].rows, vec![vec!["Math101", "3"], vec!["Eng101", "3"]]);
        assert_eq!(t[0].title, "Fall semester");
        assert_eq!(t[0].detail.as_deref(), Some("Intro to the program catalogue"));
    }

    #[test]
    fn first_paragraph_ignores_header_region() {
        let t = tables(
            "<header><p>Header para first</p></header>\
             <p>Body intro paragraph</p>\
             <h4>Spring semester</h4>\
             <table><tr><td>Math102</td><td>3</td></tr></table>",
        );
        assert_eq!(t[0].title, "Spring semester");
        assert_eq!(t[0].detail.as_deref(), Some("Body intro paragraph"));
    }

    #[test]
    fn later_tables_keep_title_and_detail() {
        let t = tables(
            "<p>Intro</p>\
             <h4>First note</h4>\
             <table><tr><td>a</td></tr></table>\
             <h3>Elective Courses</h3>\
             <small>Pick two</small>\
             <table><tr><td>b</td></tr></table>",
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t[1].title, "Elective Courses");
        assert_eq!(t[1].detail.as_deref(), Some("Pick two"));
    }

    #[test]
    fn untitled_tables_are_numbered_by_position() {
        let t = tables(
            "<table><tr><th>Only header</th></tr></table>\
             <table><tr><td>x</td></tr></table>\
             <table><tr><td>y</td></tr></table>",
        );
        // first table has no rows and is dropped, numbering still counts it
        assert_eq!(t.len(), 2);
        assert_eq!(t[1].title, "Table 3");
        assert_eq!(t[1].detail, None);
    }

    #[test]
    fn uneven_rows_are_padded_and_empty_rows_dropped() {
        let t = tables(
            "<table>\
               <tr><th>A</th><th>B</th><th>C</th></tr>\
               <tr><td>1</td></tr>\
               <tr><td>1</td><td>2</td><td>3</td></tr>\
               <tr><td></td><td> </td></tr>\
               <tr><td>x</td><td>y</td></tr>\
             </table>",
        );
        assert_eq!(t[0].headers, vec!["A", "B", "C"]);
        assert_eq!(
            t[0].rows,
            vec![
                vec!["1", "", ""],
                vec!["1", "2", "3"],
                vec!["x", "y", ""],
            ]
        );
        assert!(t[0].rows.iter().all(|r| r.len() == t[0].headers.len()));
    }

    #[test]
    fn headerless_tables_get_positional_headers() {
        let t = tables("<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td><td>e</td></tr></table>");
        assert_eq!(t[0].headers, vec!["Column 1", "Column 2", "Column 3"]);
        assert_eq!(t[0].rows[0], vec!["a", "b", ""]);
    }

    #[test]
    fn rows_wider_than_headers_extend_headers() {
        let t = tables("<table><tr><th>Name</th></tr><tr><td>a</td><td>b</td></tr></table>");
        assert_eq!(t[0].headers, vec!["Name", "Column 2"]);
    }

    #[test]
    fn no_tables() {
        assert!(tables("<p>Just text</p>").is_empty());
    }
}
