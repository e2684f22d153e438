use serde::Serialize;
use std::fmt::Write as _;

use super::{DocumentSink, Highlight, RenderError, TableCursor, TextStyle};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineCell {
    pub text: String,
    pub style: TextStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineTable {
    pub column_weights: Vec<f32>,
    pub header: Vec<OutlineCell>,
    pub rows: Vec<Vec<OutlineCell>>,
}

impl OutlineTable {
    /// Header row included.
    pub fn row_count(&self) -> usize {
        self.rows.len() + usize::from(!self.header.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlineBlock {
    SectionBreak,
    Heading { text: String, style: TextStyle },
    Table(OutlineTable),
}

/// In-memory document recording the structure the assembler produced.
#[derive(Debug, Default)]
pub struct OutlineDocument {
    blocks: Vec<OutlineBlock>,
    open: Option<(OutlineTable, TableCursor)>,
    finalized: bool,
    discarded: bool,
}

impl OutlineDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[OutlineBlock] {
        &self.blocks
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn tables(&self) -> Vec<&OutlineTable> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                OutlineBlock::Table(table) => Some(table),
                _ => None,
            })
            .collect()
    }

    pub fn headings(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                OutlineBlock::Heading { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn section_breaks(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| matches!(block, OutlineBlock::SectionBreak))
            .count()
    }

    /// Plain-text listing for console output.
    pub fn render_text(&self) -> Result<String, RenderError> {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                OutlineBlock::SectionBreak => out.push_str("\n----\n\n"),
                OutlineBlock::Heading { text, .. } => writeln!(out, "{text}")?,
                OutlineBlock::Table(table) => {
                    let header: Vec<&str> =
                        table.header.iter().map(|cell| cell.text.as_str()).collect();
                    writeln!(out, "{}", header.join(" | "))?;
                    for row in &table.rows {
                        let cells: Vec<String> = row
                            .iter()
                            .map(|cell| match cell.highlight {
                                Some(highlight) => format!("{} [{}]", cell.text, highlight.label()),
                                None => cell.text.clone(),
                            })
                            .collect();
                        writeln!(out, "- {}", cells.join(" | "))?;
                    }
                }
            }
        }
        Ok(out)
    }

    fn ensure_open(&self) -> Result<(), RenderError> {
        if self.finalized || self.discarded {
            Err(RenderError::Finalized)
        } else {
            Ok(())
        }
    }

    fn ensure_no_table(&self, context: &'static str) -> Result<(), RenderError> {
        if self.open.is_some() {
            Err(RenderError::Layout(context))
        } else {
            Ok(())
        }
    }
}

impl DocumentSink for OutlineDocument {
    fn add_section_break(&mut self) -> Result<(), RenderError> {
        self.ensure_open()?;
        self.ensure_no_table("section break inside a table")?;
        self.blocks.push(OutlineBlock::SectionBreak);
        Ok(())
    }

    fn add_heading(&mut self, text: &str, style: TextStyle) -> Result<(), RenderError> {
        self.ensure_open()?;
        self.ensure_no_table("heading inside a table")?;
        self.blocks.push(OutlineBlock::Heading {
            text: text.to_string(),
            style,
        });
        Ok(())
    }

    fn begin_table(&mut self, column_weights: &[f32]) -> Result<(), RenderError> {
        self.ensure_open()?;
        self.ensure_no_table("table already open")?;
        let cursor = TableCursor::new(column_weights.len())?;
        let table = OutlineTable {
            column_weights: column_weights.to_vec(),
            header: Vec::new(),
            rows: Vec::new(),
        };
        self.open = Some((table, cursor));
        Ok(())
    }

    fn add_header_cell(&mut self, text: &str, style: TextStyle) -> Result<(), RenderError> {
        self.ensure_open()?;
        let (table, cursor) = self
            .open
            .as_mut()
            .ok_or(RenderError::Layout("cell outside of a table"))?;
        cursor.header_cell()?;
        table.header.push(OutlineCell {
            text: text.to_string(),
            style,
            highlight: None,
        });
        Ok(())
    }

    fn add_data_cell(
        &mut self,
        text: &str,
        style: TextStyle,
        highlight: Option<Highlight>,
    ) -> Result<(), RenderError> {
        self.ensure_open()?;
        let (table, cursor) = self
            .open
            .as_mut()
            .ok_or(RenderError::Layout("cell outside of a table"))?;
        if cursor.data_cell() == 0 {
            table.rows.push(Vec::with_capacity(cursor.columns()));
        }
        if let Some(row) = table.rows.last_mut() {
            row.push(OutlineCell {
                text: text.to_string(),
                style,
                highlight,
            });
        }
        Ok(())
    }

    fn end_table(&mut self) -> Result<(), RenderError> {
        self.ensure_open()?;
        let (_, cursor) = self
            .open
            .as_ref()
            .ok_or(RenderError::Layout("no table to end"))?;
        cursor.close()?;
        if let Some((table, _)) = self.open.take() {
            self.blocks.push(OutlineBlock::Table(table));
        }
        Ok(())
    }

    fn finalize_document(&mut self) -> Result<(), RenderError> {
        self.ensure_open()?;
        self.ensure_no_table("table left open")?;
        self.finalized = true;
        Ok(())
    }

    fn discard(&mut self) {
        if self.finalized {
            return;
        }
        self.discarded = true;
        self.blocks.clear();
        self.open = None;
    }
}
