//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits `key=value` lines.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use esolar_core::{AggregateDocument, FieldSchema, FieldValue, Reading, ReadingSource};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&plain_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
    let _ = stdout.flush();
}

// ── Readings ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

/// Render a reading. Absent fields are listed only with `all`.
pub fn render_reading(
    format: OutputFormat,
    reading: &Reading,
    source: &ReadingSource,
    schema: &FieldSchema,
    all: bool,
    color: bool,
) -> Result<String, CliError> {
    render_single(
        format,
        reading,
        |r| reading_table(r, source, schema, all, color),
        |r| {
            r.fields
                .iter()
                .filter_map(|(key, value)| match value {
                    Some(v) => Some(format!("{key}={}", plain_value(v))),
                    None if all => Some(format!("{key}=")),
                    None => None,
                })
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}

fn reading_table(
    reading: &Reading,
    source: &ReadingSource,
    schema: &FieldSchema,
    all: bool,
    color: bool,
) -> String {
    let rows: Vec<FieldRow> = reading
        .fields
        .iter()
        .filter(|(_, value)| all || value.is_some())
        .map(|(key, value)| FieldRow {
            key: key.to_owned(),
            value: value.map_or_else(|| "-".to_owned(), display_value),
            unit: schema
                .get(key)
                .and_then(|spec| spec.unit)
                .map(|u| u.to_string())
                .unwrap_or_default(),
        })
        .collect();

    let mut header = format!(
        "Plant {} · {}",
        reading.ids.plant_uid,
        reading.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let ReadingSource::Stale { error, .. } = source {
        header.push_str(&format!(" · stale ({error})"));
    } else if *source == ReadingSource::Cached {
        header.push_str(" · cached");
    }
    if color {
        header = header.dimmed().to_string();
    }

    let mut out = format!("{header}\n{}", render_table(&rows));
    for err in &reading.errors {
        let line = format!("warning: {err}");
        out.push('\n');
        if color {
            out.push_str(&line.yellow().to_string());
        } else {
            out.push_str(&line);
        }
    }
    out
}

/// Render the merged portal responses. Tables make no sense for nested
/// JSON, so the table format prints pretty JSON.
pub fn render_document(format: OutputFormat, doc: &AggregateDocument) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Json => render_json(doc, false),
        OutputFormat::JsonCompact => render_json(doc, true),
        OutputFormat::Yaml => render_yaml(doc),
        OutputFormat::Plain => Ok(doc.keys().collect::<Vec<_>>().join("\n")),
    }
}

fn display_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "null".to_owned(),
        other => other.to_string(),
    }
}

fn plain_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}
