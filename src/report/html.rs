//! HTML report rendering.
//!
//! Reports are self-contained documents with embedded CSS: a status
//! table per section, color-coded by status value, wrapped in a fixed
//! page template with a generation timestamp footer. All cell text is
//! scrubbed and escaped before it reaches the page.

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::{ReportError, Result};
use crate::report::rows::NormalizedRow;
use crate::schema::Field;

/// One rendered table. Standard reports have a single section; special
/// reports get one per detected header block.
#[derive(Debug, Clone)]
pub struct ReportSection {
    pub heading: Option<String>,
    pub rows: Vec<NormalizedRow>,
}

/// Render a complete report document.
pub fn render_document(
    worksheet: &str,
    sections: &[ReportSection],
    generated: NaiveDateTime,
) -> Result<String> {
    let sanitizer = Sanitizer::new()?;
    let body: String = sections
        .iter()
        .map(|section| render_section(section, &sanitizer))
        .collect();

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Release Status: {title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        <h1>Release Status: {title}</h1>
        {body}
        <footer>
            <p>Generated {timestamp}</p>
        </footer>
    </div>
</body>
</html>
"#,
        title = html_escape(worksheet),
        css = inline_css(),
        body = body,
        timestamp = generated.format("%Y-%m-%d %H:%M:%S"),
    ))
}

fn render_section(section: &ReportSection, sanitizer: &Sanitizer) -> String {
    let heading = section
        .heading
        .as_deref()
        .map(|h| format!("<h2>{}</h2>\n", html_escape(h)))
        .unwrap_or_default();

    let rows: String = section
        .rows
        .iter()
        .map(|row| render_row(row, sanitizer))
        .collect();

    format!(
        r#"{heading}<table>
<thead>
<tr><th>Component</th><th>Status</th><th>Owner</th><th>Target Date</th><th>Days Until Due</th><th>Notes</th></tr>
</thead>
<tbody>
{rows}</tbody>
</table>
"#,
    )
}

fn render_row(row: &NormalizedRow, sanitizer: &Sanitizer) -> String {
    let cell = |field: Field| html_escape(&sanitizer.clean(row.get(field)));
    format!(
        "<tr class=\"{class}\"><td>{component}</td><td>{status}</td><td>{owner}</td><td>{target}</td><td>{days}</td><td>{notes}</td></tr>\n",
        class = status_class(row.status()),
        component = cell(Field::Component),
        status = cell(Field::Status),
        owner = cell(Field::Owner),
        target = cell(Field::TargetDate),
        days = html_escape(&row.days_display()),
        notes = cell(Field::Notes),
    )
}

/// CSS class for a status value. Matching is case-insensitive with
/// hyphens and underscores read as spaces, so "due-soon" and
/// "Due Soon" land in the same bucket.
pub fn status_class(status: &str) -> &'static str {
    let normalized: String = status
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect();

    match normalized.as_str() {
        "complete" | "completed" | "done" | "closed" => "status-green",
        "in progress" | "due soon" | "on track" => "status-yellow",
        "pending" | "not started" | "blocked" | "at risk" => "status-red",
        _ => "status-none",
    }
}

/// Strips active content from cell text before escaping.
///
/// Escaping alone would neutralize markup, but stripping keeps script
/// bodies and `javascript:` schemes out of the document entirely. The
/// patterns are compiled once per render.
pub struct Sanitizer {
    script_block: Regex,
    script_tag: Regex,
    js_uri: Regex,
}

impl Sanitizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            script_block: build_pattern(r"(?is)<script\b[^>]*>.*?</script\s*>")?,
            script_tag: build_pattern(r"(?i)</?script\b[^>]*>")?,
            js_uri: build_pattern(r"(?i)javascript\s*:")?,
        })
    }

    /// Remove script elements, stray script tags, and javascript: URIs.
    pub fn clean(&self, text: &str) -> String {
        let cleaned = self.script_block.replace_all(text, "");
        let cleaned = self.script_tag.replace_all(&cleaned, "");
        self.js_uri.replace_all(&cleaned, "").into_owned()
    }
}

fn build_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ReportError::Render {
        artifact: "html".to_string(),
        reason: e.to_string(),
    })
}

/// Escape text for HTML element content.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn inline_css() -> &'static str {
    r#"
body { font-family: system-ui, 'Segoe UI', sans-serif; color: #1f2430; background: #ffffff; }
.container { max-width: 1100px; margin: 0 auto; padding: 1.5rem; }
h1 { font-size: 1.5rem; margin-bottom: 1rem; }
h2 { font-size: 1.1rem; margin: 1.25rem 0 0.5rem; }
table { border-collapse: collapse; width: 100%; margin-bottom: 1rem; }
th, td { border: 1px solid #d0d4dc; padding: 0.4rem 0.6rem; text-align: left; font-size: 0.9rem; }
th { background: #eef1f5; }
tr.status-green td { background: #e3f4e3; }
tr.status-yellow td { background: #fdf6dd; }
tr.status-red td { background: #fbe3e0; }
footer { color: #6b7280; font-size: 0.8rem; margin-top: 1rem; }
"#
}
