use std::{collections::HashMap, fmt::Write, fs, path::Path};

use serde_json::Value;
use tera::{Context, Tera};
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::report::Report;

/// Signature shared by every helper exposed to CSV templates.
pub type FilterFn = fn(&Value, &HashMap<String, Value>) -> tera::Result<Value>;

/// Named helpers registered on every renderer.
pub const CSV_FILTERS: &[(&str, FilterFn)] = &[
    ("escape_csv", escape_csv_filter),
    ("escape_string", escape_string_filter),
    ("nvd_v3_score", nvd_v3_score),
    ("rh_v3_score", rh_v3_score),
    ("nvd_v3_vector", nvd_v3_vector),
    ("rh_v3_vector", rh_v3_vector),
];

const NVD: &str = "nvd";
const REDHAT: &str = "redhat";

/// Renders a normalized report through a single Tera template.
#[derive(Debug)]
pub struct CsvRenderer {
    tera: Tera,
    name: String,
}

impl CsvRenderer {
    /// Load the template at `path`; the file name becomes the template name.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| ConvertError::LoadTemplate {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "csv.tpl".to_string());
        debug!(template = %path.display(), "loaded CSV template");
        Self::from_source(name, &source)
    }

    /// Build a renderer from in-memory template text.
    pub fn from_source(name: impl Into<String>, source: &str) -> Result<Self> {
        Self::with_filters(name, source, CSV_FILTERS)
    }

    /// Build a renderer with an explicit helper table.
    pub fn with_filters(
        name: impl Into<String>,
        source: &str,
        filters: &[(&str, FilterFn)],
    ) -> Result<Self> {
        let name = name.into();
        let mut tera = Tera::default();
        for (filter_name, filter) in filters {
            tera.register_filter(filter_name, *filter);
        }
        tera.add_raw_template(&name, source)?;
        Ok(Self { tera, name })
    }

    /// Render the report. The template sees `results` and `report`.
    pub fn render(&self, report: &Report) -> Result<String> {
        let mut context = Context::new();
        context.insert("results", &report.results);
        context.insert("report", report);
        Ok(self.tera.render(&self.name, &context)?)
    }
}

/// Quote a field for CSV embedding.
///
/// The value is wrapped in `"` and inner quotes are doubled. Backslashes,
/// control characters and other non-printable characters (format characters,
/// non-ASCII spaces, line/paragraph separators) are written as escape
/// sequences so a record never spans lines and invisible text stays visible.
pub fn escape_csv(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('"');
    for c in input.chars() {
        match c {
            '"' => out.push_str("\"\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0b}' => out.push_str("\\v"),
            '\u{0c}' => out.push_str("\\f"),
            c if is_printable(c) => out.push(c),
            c if (c as u32) < 0x80 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) <= 0xffff => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('"');
    out
}

/// Printable means not a control, format or separator character; ASCII space
/// is the only space that passes.
fn is_printable(c: char) -> bool {
    !matches!(
        c,
        '\u{0}'..='\u{1f}'
            | '\u{7f}'..='\u{9f}'
            | '\u{a0}'
            | '\u{ad}'
            | '\u{600}'..='\u{605}'
            | '\u{61c}'
            | '\u{6dd}'
            | '\u{70f}'
            | '\u{1680}'
            | '\u{180e}'
            | '\u{2000}'..='\u{200f}'
            | '\u{2028}'..='\u{202f}'
            | '\u{205f}'..='\u{2064}'
            | '\u{2066}'..='\u{206f}'
            | '\u{3000}'
            | '\u{feff}'
            | '\u{fff9}'..='\u{fffb}'
            | '\u{e0001}'
            | '\u{e0020}'..='\u{e007f}'
    )
}

/// Render a JSON value as text the way Tera prints it: whole floats lose
/// their fractional part.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn string_arg<'a>(value: &'a Value, filter: &str) -> tera::Result<&'a str> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(tera::Error::msg(format!(
            "filter `{filter}` expects a string, got {other}"
        ))),
    }
}

fn escape_csv_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(escape_csv(&value_text(value))))
}

fn escape_string_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    string_arg(value, "escape_string").map(|s| Value::String(s.to_string()))
}

fn vendor_field<'a>(cvss: &'a Value, vendor: &str, field: &str) -> Option<&'a Value> {
    cvss.get(vendor).and_then(|entry| entry.get(field))
}

fn vendor_score(cvss: &Value, vendor: &str) -> Value {
    let score = vendor_field(cvss, vendor, "V3Score")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    Value::from(score)
}

fn vendor_vector(cvss: &Value, vendor: &str) -> Value {
    let vector = vendor_field(cvss, vendor, "V3Vector")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Value::String(vector.to_string())
}

fn nvd_v3_score(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(vendor_score(value, NVD))
}

fn rh_v3_score(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(vendor_score(value, REDHAT))
}

fn nvd_v3_vector(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(vendor_vector(value, NVD))
}

fn rh_v3_vector(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(vendor_vector(value, REDHAT))
}
