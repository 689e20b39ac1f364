use std::fmt::Write as _;

pub const DISPLAY_REGION_ID: &str = "predictions";
pub const LOADING_MESSAGE: &str = "Loading predictions...";
pub const SPINNER_LABEL: &str = "Loading...";

#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Loading { message: String, spinner_label: String },
    Paragraph(String),
    Heading { level: u8, text: String },
    Table(PredictionTable),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub date: String,
    pub price: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PredictionTable {
    pub headers: [String; 2],
    pub rows: Vec<TableRow>,
}

impl PredictionTable {
    pub fn new(rows: Vec<TableRow>) -> Self {
        PredictionTable {
            headers: ["Date".to_string(), "Predicted Price ($)".to_string()],
            rows,
        }
    }
}

/// The container whose content switches between loading, error and results.
#[derive(Clone, Debug)]
pub struct DisplayRegion {
    id: String,
    contents: Vec<Content>,
}

impl Default for DisplayRegion {
    fn default() -> Self {
        DisplayRegion::new(DISPLAY_REGION_ID)
    }
}

impl DisplayRegion {
    pub fn new(id: impl Into<String>) -> Self {
        DisplayRegion {
            id: id.into(),
            contents: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    pub fn clear(&mut self) {
        self.contents.clear();
    }

    pub fn set_loading(&mut self) {
        self.contents = vec![Content::Loading {
            message: LOADING_MESSAGE.to_string(),
            spinner_label: SPINNER_LABEL.to_string(),
        }];
    }

    pub fn set_paragraph(&mut self, text: impl Into<String>) {
        self.contents = vec![Content::Paragraph(text.into())];
    }

    pub fn push(&mut self, content: Content) {
        self.contents.push(content);
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.contents.as_slice(), [Content::Loading { .. }])
    }

    #[cfg(test)]
    pub fn tables(&self) -> impl Iterator<Item = &PredictionTable> {
        self.contents.iter().filter_map(|content| match content {
            Content::Table(table) => Some(table),
            _ => None,
        })
    }

    #[cfg(test)]
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.contents.iter().filter_map(|content| match content {
            Content::Paragraph(text) => Some(text.as_str()),
            _ => None,
        })
    }

    #[cfg(test)]
    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.contents.iter().filter_map(|content| match content {
            Content::Heading { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Inner HTML of the region, as the prediction page markup.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for content in &self.contents {
            match content {
                Content::Loading {
                    message,
                    spinner_label,
                } => {
                    let _ = write!(
                        html,
                        "<p>{}</p><div class=\"spinner-border\" role=\"status\"><span class=\"sr-only\">{}</span></div>",
                        escape_html(message),
                        escape_html(spinner_label)
                    );
                }
                Content::Paragraph(text) => {
                    let _ = write!(html, "<p>{}</p>", escape_html(text));
                }
                Content::Heading { level, text } => {
                    let level = (*level).clamp(1, 6);
                    let _ = write!(html, "<h{level}>{}</h{level}>", escape_html(text));
                }
                Content::Table(table) => write_table(&mut html, table),
            }
        }
        html
    }
}

fn write_table(html: &mut String, table: &PredictionTable) {
    html.push_str("<table style=\"width: 100%; border-collapse: collapse;\"><thead><tr>");
    for header in &table.headers {
        let _ = write!(html, "<th>{}</th>", escape_html(header));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(&row.date),
            escape_html(&row.price)
        );
    }
    html.push_str("</tbody></table>");
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
