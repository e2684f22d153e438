mod html;
mod outline;

use serde::Serialize;
use std::path::PathBuf;

pub use html::HtmlDocument;
pub use outline::{OutlineBlock, OutlineCell, OutlineDocument, OutlineTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    Normal,
    Bold,
    Heading,
}

/// Visual tag applied to a data cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    Warning,
    Danger,
}

impl Highlight {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Warning => "Warning",
            Self::Danger => "Danger",
        }
    }

    pub const fn color(self) -> &'static str {
        match self {
            Self::Warning => "orange",
            Self::Danger => "red",
        }
    }
}

/// Font resources shared by every text style of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typography {
    font_family: String,
    heading_size_pt: u8,
}

impl Typography {
    pub const DEFAULT_HEADING_SIZE_PT: u8 = 18;

    pub fn new(font_family: impl Into<String>) -> Result<Self, RenderError> {
        let font_family = font_family.into().trim().to_string();
        if font_family.is_empty() {
            return Err(RenderError::Typography("font family is empty".to_string()));
        }
        if font_family
            .chars()
            .any(|c| matches!(c, ';' | '{' | '}' | '<' | '>' | '"'))
        {
            return Err(RenderError::Typography(format!(
                "font family '{font_family}' contains reserved characters"
            )));
        }

        Ok(Self {
            font_family,
            heading_size_pt: Self::DEFAULT_HEADING_SIZE_PT,
        })
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn heading_size_pt(&self) -> u8 {
        self.heading_size_pt
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write report to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("typography unavailable: {0}")]
    Typography(String),
    #[error("unable to format report text: {0}")]
    Format(#[from] std::fmt::Error),
    #[error("invalid table layout: {0}")]
    Layout(&'static str),
    #[error("document already finalized")]
    Finalized,
}

/// Layout operations the report assembler drives.
///
/// Implementations buffer content until `finalize_document`; `discard` drops
/// everything written so far so a failed run leaves no output behind.
pub trait DocumentSink {
    fn add_section_break(&mut self) -> Result<(), RenderError>;
    fn add_heading(&mut self, text: &str, style: TextStyle) -> Result<(), RenderError>;
    fn begin_table(&mut self, column_weights: &[f32]) -> Result<(), RenderError>;
    fn add_header_cell(&mut self, text: &str, style: TextStyle) -> Result<(), RenderError>;
    fn add_data_cell(
        &mut self,
        text: &str,
        style: TextStyle,
        highlight: Option<Highlight>,
    ) -> Result<(), RenderError>;
    fn end_table(&mut self) -> Result<(), RenderError>;
    fn finalize_document(&mut self) -> Result<(), RenderError>;
    fn discard(&mut self);
}

/// Tracks the open table so sinks can reject malformed cell sequences.
#[derive(Debug, Clone, Default)]
pub(crate) struct TableCursor {
    columns: usize,
    header_cells: usize,
    data_cells: usize,
}

impl TableCursor {
    pub(crate) fn new(columns: usize) -> Result<Self, RenderError> {
        if columns == 0 {
            return Err(RenderError::Layout("table needs at least one column"));
        }
        Ok(Self {
            columns,
            ..Self::default()
        })
    }

    pub(crate) fn columns(&self) -> usize {
        self.columns
    }

    pub(crate) fn header_cell(&mut self) -> Result<usize, RenderError> {
        if self.data_cells > 0 {
            return Err(RenderError::Layout("header cell after data rows"));
        }
        if self.header_cells == self.columns {
            return Err(RenderError::Layout("more header cells than columns"));
        }
        self.header_cells += 1;
        Ok(self.header_cells - 1)
    }

    pub(crate) fn has_data(&self) -> bool {
        self.data_cells > 0
    }

    /// Returns the column index of the new data cell.
    pub(crate) fn data_cell(&mut self) -> usize {
        self.data_cells += 1;
        (self.data_cells - 1) % self.columns
    }

    pub(crate) fn close(&self) -> Result<(), RenderError> {
        if self.header_cells != 0 && self.header_cells != self.columns {
            return Err(RenderError::Layout("incomplete header row"));
        }
        if self.data_cells % self.columns != 0 {
            return Err(RenderError::Layout("incomplete data row"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typography_rejects_blank_and_reserved_names() {
        assert!(matches!(
            Typography::new("  "),
            Err(RenderError::Typography(_))
        ));
        assert!(matches!(
            Typography::new("Helvetica; color: red"),
            Err(RenderError::Typography(_))
        ));
        let typography = Typography::new(" Helvetica ").expect("valid family");
        assert_eq!(typography.font_family(), "Helvetica");
        assert_eq!(typography.heading_size_pt(), 18);
    }

    #[test]
    fn cursor_tracks_rows() {
        let mut cursor = TableCursor::new(2).expect("cursor opens");
        cursor.header_cell().expect("first header");
        cursor.header_cell().expect("second header");
        assert!(cursor.header_cell().is_err());
        assert_eq!(cursor.data_cell(), 0);
        assert!(cursor.close().is_err());
        assert_eq!(cursor.data_cell(), 1);
        assert!(cursor.header_cell().is_err());
        cursor.close().expect("complete row closes");
    }
}
