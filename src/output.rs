/// Output Module
///
/// This module renders snippet results for the terminal: a single document as
/// pretty relaxed Extended JSON, or a list of documents as a grid whose columns
/// are the union of the documents' top-level fields in first-seen order.
/// Grids can also be exported as CSV, JSON or Markdown.

use crate::core::{Result, SnippetError};
use mongodb::bson::{Bson, Document};
use std::fmt;
use std::str::FromStr;

/// Pretty relaxed Extended JSON for one document.
pub fn pretty_json(doc: &Document) -> Result<String> {
    let value = Bson::Document(doc.clone()).into_relaxed_extjson();
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Plain-text rendering of a single value for a grid cell.
pub fn cell_text(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(n) => n.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::Null => "null".to_string(),
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

/// Supported grid output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = SnippetError;

    fn from_str(format: &str) -> Result<Self> {
        match format.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(SnippetError::Output(format!(
                "Unsupported output format: '{}'. Supported formats: table, csv, json, markdown",
                format
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
        };
        f.write_str(name)
    }
}

/// A grid of documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentGrid {
    pub headers: Vec<String>,
    pub documents: Vec<Document>,
    /// Maximum number of rows shown by [`DocumentGrid::render`]
    pub limit: Option<usize>,
}

impl DocumentGrid {
    /// Creates a new, empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut grid = DocumentGrid::new();
        for doc in documents {
            grid.push(doc);
        }
        grid
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Adds a document, extending the headers with any new top-level fields.
    pub fn push(&mut self, doc: Document) {
        for key in doc.keys() {
            if !self.headers.iter().any(|h| h == key) {
                self.headers.push(key.clone());
            }
        }
        self.documents.push(doc);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn row(&self, doc: &Document) -> Vec<String> {
        self.headers
            .iter()
            .map(|h| doc.get(h).map(cell_text).unwrap_or_default())
            .collect()
    }

    /// Renders the grid as an aligned table.
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let shown = self.limit.unwrap_or(self.documents.len()).min(self.documents.len());
        let rows: Vec<Vec<String>> = self.documents[..shown].iter().map(|d| self.row(d)).collect();

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| -> String {
            let filled = cells.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
            let padded: Vec<String> = cells[..filled]
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect();
            padded.join(" | ").trim_end().to_string()
        };

        let mut output = String::new();
        output.push_str(&line(&self.headers));
        output.push('\n');
        let underline: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        output.push_str(&underline.join("-+-"));
        output.push('\n');
        for row in &rows {
            output.push_str(&line(row));
            output.push('\n');
        }
        if shown < self.documents.len() {
            output.push_str(&format!("... {} more\n", self.documents.len() - shown));
        }
        output
    }

    /// Exports the whole grid (ignoring the row limit).
    pub fn export(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => Ok(self.clone().without_limit().render()),
            OutputFormat::Csv => Ok(self.export_to_csv()),
            OutputFormat::Json => self.export_to_json(),
            OutputFormat::Markdown => Ok(self.export_to_markdown()),
        }
    }

    fn without_limit(mut self) -> Self {
        self.limit = None;
        self
    }

    fn export_to_csv(&self) -> String {
        let mut output = String::new();
        if self.headers.is_empty() {
            return output;
        }
        let escaped: Vec<String> = self.headers.iter().map(|h| csv_field(h)).collect();
        output.push_str(&escaped.join(","));
        output.push('\n');
        for doc in &self.documents {
            let escaped: Vec<String> = self.row(doc).iter().map(|c| csv_field(c)).collect();
            output.push_str(&escaped.join(","));
            output.push('\n');
        }
        output
    }

    fn export_to_json(&self) -> Result<String> {
        let values: Vec<serde_json::Value> = self
            .documents
            .iter()
            .map(|d| Bson::Document(d.clone()).into_relaxed_extjson())
            .collect();
        Ok(serde_json::to_string(&values)?)
    }

    fn export_to_markdown(&self) -> String {
        let mut output = String::new();
        if self.headers.is_empty() {
            return output;
        }
        output.push_str(&format!("| {} |\n", self.headers.join(" | ")));
        let underline: Vec<String> = self.headers.iter().map(|h| "-".repeat(h.len().max(3))).collect();
        output.push_str(&format!("| {} |\n", underline.join(" | ")));
        for doc in &self.documents {
            let cells: Vec<String> = self.row(doc).iter().map(|c| c.replace('|', "\\|")).collect();
            output.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        output
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
