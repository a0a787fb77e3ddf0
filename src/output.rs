use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::BilingualRow;
use crate::error::Result;
use crate::parser::tables::TableRecord;
use crate::parser::PageExtraction;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*?>").unwrap());
static PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const CSV_HEADER: [&str; 3] = ["ID", "English_Text", "Khmer_Text"];
const MAX_FILENAME_CHARS: usize = 80;

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Write the flattened bilingual rows as CSV. Returns the written path.
pub fn write_csv(rows: &[BilingualRow], dir: &Path, filename: Option<&str>) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = match filename {
        Some(name) => dir.join(name),
        None => dir.join(format!("scraped_content_{}.csv", timestamp())),
    };

    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(&path)?;
    wtr.write_record(CSV_HEADER)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    info!("Data successfully saved to {}", path.display());
    Ok(path)
}

/// Filesystem-safe stem: tags and punctuation stripped, whitespace to `_`.
pub fn safe_filename(text: &str) -> String {
    let text = TAG_RE.replace_all(text, "");
    let text = PUNCT_RE.replace_all(&text, "");
    let text = SPACE_RE.replace_all(text.trim(), "_");
    text.chars().take(MAX_FILENAME_CHARS).collect()
}

/// Text up to (not including) the first `.`.
pub fn first_sentence(text: &str) -> &str {
    text.split('.').next().unwrap_or(text)
}

/// Break long captions (more than 10 words) onto two lines, preferring the
/// first word at or past the midpoint that ends in `.` or `,`.
pub fn split_detail(detail: &str) -> String {
    let words: Vec<&str> = detail.split_whitespace().collect();
    if words.len() <= 10 {
        return detail.to_string();
    }

    let mid = words.len() / 2;
    let cut = (mid..words.len())
        .find(|&i| words[i].ends_with(['.', ',']))
        .map(|i| i + 1)
        .unwrap_or(mid);

    format!("{}\n{}", words[..cut].join(" "), words[cut..].join(" "))
}

/// What a table renderer receives for one table.
#[derive(Debug, Serialize)]
pub struct TableHandoff<'a> {
    pub url: &'a str,
    pub position: usize,
    /// `{stem}_{position}`, the name shared by this table's JSON file and any rendering of it.
    #[serde(skip)]
    pub file_stem: String,
    pub caption: String,
    #[serde(flatten)]
    pub table: &'a TableRecord,
}

/// Hand-off records for one page's tables. All images of a page share the
/// first table's title as a name stem; only the first table carries its
/// detail in the caption.
pub fn table_handoffs<'a>(url: &'a str, tables: &'a [TableRecord]) -> Vec<TableHandoff<'a>> {
    let stem = tables
        .first()
        .map(|t| safe_filename(&t.title))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "table".to_string());
    tables
        .iter()
        .enumerate()
        .map(|(i, table)| {
            let caption = match (&table.detail, i) {
                (Some(detail), 0) => format!("{}\n{}", table.title, split_detail(first_sentence(detail))),
                _ => table.title.clone(),
            };
            TableHandoff {
                url,
                position: i + 1,
                file_stem: format!("{}_{}", stem, i + 1),
                caption,
                table,
            }
        })
        .collect()
}

/// Write each table to `{dir}/tables/{stem}_{n}.json`. Returns the written
/// paths; the directory is only created when some page has tables.
pub fn write_tables_json(pages: &[PageExtraction], dir: &Path) -> Result<Vec<PathBuf>> {
    let handoffs: Vec<TableHandoff<'_>> = pages
        .iter()
        .flat_map(|p| table_handoffs(&p.page.url, &p.tables))
        .collect();
    if handoffs.is_empty() {
        return Ok(Vec::new());
    }

    let dir = dir.join("tables");
    std::fs::create_dir_all(&dir)?;

    let mut written = Vec::with_capacity(handoffs.len());
    for handoff in &handoffs {
        let path = dir.join(format!("{}.json", handoff.file_stem));
        if written.contains(&path) {
            warn!("Overwriting {} with a table from {}", path.display(), handoff.url);
        }
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), handoff)?;
        written.push(path);
    }

    info!("Wrote {} tables to {}", written.len(), dir.display());
    Ok(written)
}
