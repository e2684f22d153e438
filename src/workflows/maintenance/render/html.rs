use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{DocumentSink, Highlight, RenderError, TableCursor, TextStyle, Typography};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentState {
    Open,
    Finalized,
    Discarded,
}

/// Printable HTML report written all-or-nothing.
///
/// The partial file next to the target is created up front and only renamed
/// onto the target by `finalize_document`. Dropping an unfinalized document
/// removes the partial file.
#[derive(Debug)]
pub struct HtmlDocument {
    path: PathBuf,
    partial_path: PathBuf,
    file: Option<File>,
    typography: Typography,
    body: String,
    table: Option<TableCursor>,
    state: DocumentState,
}

impl HtmlDocument {
    pub fn create<P: AsRef<Path>>(path: P, typography: Typography) -> Result<Self, RenderError> {
        let path = path.as_ref().to_path_buf();
        let partial_path = partial_path_for(&path);
        let file = File::create(&partial_path).map_err(|source| RenderError::Io {
            path: partial_path.clone(),
            source,
        })?;
        debug!(path = %partial_path.display(), "report output target acquired");

        Ok(Self {
            path,
            partial_path,
            file: Some(file),
            typography,
            body: String::new(),
            table: None,
            state: DocumentState::Open,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finalized(&self) -> bool {
        self.state == DocumentState::Finalized
    }

    fn ensure_open(&self) -> Result<(), RenderError> {
        match self.state {
            DocumentState::Open => Ok(()),
            DocumentState::Finalized | DocumentState::Discarded => Err(RenderError::Finalized),
        }
    }

    fn table_mut(&mut self) -> Result<&mut TableCursor, RenderError> {
        self.table
            .as_mut()
            .ok_or(RenderError::Layout("cell outside of a table"))
    }

    fn stylesheet(&self) -> Result<String, RenderError> {
        let mut css = String::new();
        writeln!(
            css,
            "body {{ font-family: \"{}\", sans-serif; font-size: 10pt; }}",
            self.typography.font_family()
        )?;
        writeln!(
            css,
            "h1.property {{ font-size: {}pt; text-decoration: underline; }}",
            self.typography.heading_size_pt()
        )?;
        css.push_str("table { width: 100%; border-collapse: collapse; }\n");
        css.push_str("th, td { border: 1px solid #444; padding: 2pt 4pt; text-align: left; }\n");
        css.push_str(".bold { font-weight: bold; }\n");
        for highlight in [Highlight::Warning, Highlight::Danger] {
            writeln!(
                css,
                ".{} {{ color: {}; }}",
                highlight_class(highlight),
                highlight.color()
            )?;
        }
        css.push_str(".page-break { page-break-after: always; break-after: page; }\n");
        Ok(css)
    }

    fn render(&self) -> Result<String, RenderError> {
        let mut html = String::with_capacity(self.body.len() + 1024);
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Property Maintenance Report</title>\n<style>\n");
        html.push_str(&self.stylesheet()?);
        html.push_str("</style>\n</head>\n<body>\n");
        html.push_str(&self.body);
        html.push_str("</body>\n</html>\n");
        Ok(html)
    }

    fn io_error(&self, source: io::Error) -> RenderError {
        RenderError::Io {
            path: self.partial_path.clone(),
            source,
        }
    }
}

impl DocumentSink for HtmlDocument {
    fn add_section_break(&mut self) -> Result<(), RenderError> {
        self.ensure_open()?;
        if self.table.is_some() {
            return Err(RenderError::Layout("section break inside a table"));
        }
        self.body.push_str("<div class=\"page-break\"></div>\n");
        Ok(())
    }

    fn add_heading(&mut self, text: &str, style: TextStyle) -> Result<(), RenderError> {
        self.ensure_open()?;
        if self.table.is_some() {
            return Err(RenderError::Layout("heading inside a table"));
        }
        match style {
            TextStyle::Heading => {
                writeln!(self.body, "<h1 class=\"property\">{}</h1>", escape_html(text))?
            }
            TextStyle::Bold => writeln!(self.body, "<p class=\"bold\">{}</p>", escape_html(text))?,
            TextStyle::Normal => writeln!(self.body, "<p>{}</p>", escape_html(text))?,
        }
        Ok(())
    }

    fn begin_table(&mut self, column_weights: &[f32]) -> Result<(), RenderError> {
        self.ensure_open()?;
        if self.table.is_some() {
            return Err(RenderError::Layout("table already open"));
        }
        if column_weights
            .iter()
            .any(|weight| !weight.is_finite() || *weight <= 0.0)
        {
            return Err(RenderError::Layout("column weights must be positive"));
        }
        let cursor = TableCursor::new(column_weights.len())?;
        let total: f32 = column_weights.iter().sum();

        self.body.push_str("<table>\n<colgroup>");
        for weight in column_weights {
            write!(
                self.body,
                "<col style=\"width: {:.1}%\">",
                weight / total * 100.0
            )?;
        }
        self.body.push_str("</colgroup>\n");
        self.table = Some(cursor);
        Ok(())
    }

    fn add_header_cell(&mut self, text: &str, style: TextStyle) -> Result<(), RenderError> {
        self.ensure_open()?;
        let cursor = self.table_mut()?;
        let column = cursor.header_cell()?;
        let last = column + 1 == cursor.columns();

        if column == 0 {
            self.body.push_str("<thead><tr>");
        }
        write!(
            self.body,
            "<th class=\"{}\">{}</th>",
            style_class(style),
            escape_html(text)
        )?;
        if last {
            self.body.push_str("</tr></thead>\n");
        }
        Ok(())
    }

    fn add_data_cell(
        &mut self,
        text: &str,
        style: TextStyle,
        highlight: Option<Highlight>,
    ) -> Result<(), RenderError> {
        self.ensure_open()?;
        let cursor = self.table_mut()?;
        let first_in_body = !cursor.has_data();
        let column = cursor.data_cell();
        let last = column + 1 == cursor.columns();

        if first_in_body {
            self.body.push_str("<tbody>\n");
        }
        if column == 0 {
            self.body.push_str("<tr>");
        }
        let class = match highlight {
            Some(highlight) => format!("{} {}", style_class(style), highlight_class(highlight)),
            None => style_class(style).to_string(),
        };
        write!(self.body, "<td class=\"{class}\">{}</td>", escape_html(text))?;
        if last {
            self.body.push_str("</tr>\n");
        }
        Ok(())
    }

    fn end_table(&mut self) -> Result<(), RenderError> {
        self.ensure_open()?;
        let cursor = self
            .table
            .as_ref()
            .ok_or(RenderError::Layout("no table to end"))?;
        cursor.close()?;
        let has_data = cursor.has_data();
        self.table = None;
        if has_data {
            self.body.push_str("</tbody>\n");
        }
        self.body.push_str("</table>\n");
        Ok(())
    }

    fn finalize_document(&mut self) -> Result<(), RenderError> {
        self.ensure_open()?;
        if self.table.is_some() {
            return Err(RenderError::Layout("table left open"));
        }

        let html = self.render()?;
        let mut file = self
            .file
            .take()
            .ok_or(RenderError::Finalized)?;
        file.write_all(html.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|source| self.io_error(source))?;
        drop(file);

        fs::rename(&self.partial_path, &self.path).map_err(|source| RenderError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.state = DocumentState::Finalized;
        debug!(path = %self.path.display(), bytes = html.len(), "report document finalized");
        Ok(())
    }

    fn discard(&mut self) {
        if self.state != DocumentState::Open {
            return;
        }
        self.state = DocumentState::Discarded;
        self.body.clear();
        self.table = None;
        self.file = None;

        match fs::remove_file(&self.partial_path) {
            Ok(()) => debug!(path = %self.partial_path.display(), "partial report discarded"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.partial_path.display(),
                error = %err,
                "unable to remove partial report"
            ),
        }
    }
}

impl Drop for HtmlDocument {
    fn drop(&mut self) {
        self.discard();
    }
}

fn partial_path_for(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_os_string();
    partial.push(".part");
    PathBuf::from(partial)
}

const fn style_class(style: TextStyle) -> &'static str {
    match style {
        TextStyle::Normal => "normal",
        TextStyle::Bold => "bold",
        TextStyle::Heading => "heading",
    }
}

const fn highlight_class(highlight: Highlight) -> &'static str {
    match highlight {
        Highlight::Warning => "warning",
        Highlight::Danger => "danger",
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
