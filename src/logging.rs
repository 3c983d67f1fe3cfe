//! Log output: a compact line formatter plus a boxed word-diff rendering of
//! caption cleanup traces.

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::fmt::{self, Write as _};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const CLEANUP_TARGET: &str = "caption_forge::text_pipeline";
const DEFAULT_FILTER: &str = "caption_forge=info";
const CRATE_PREFIX: &str = "caption_forge::";
const MAX_DIFF_BYTES: usize = 2048;
const PREVIEW_CHARS: usize = 160;
const TARGET_WIDTH: usize = 20;
const CLOCK_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().event_format(CaptionLogFormatter))
        .init();
}

/// Every step of one normalizer run, including the ones that changed nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupTrace {
    pub raw: String,
    pub clean: String,
    pub steps: Vec<CleanupStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupStep {
    pub name: String,
    pub before: String,
    pub after: String,
    /// Matches removed or rewritten, when the step can count them.
    pub hits: usize,
}

impl CleanupStep {
    pub fn new(name: &str, before: &str, after: &str, hits: usize) -> Self {
        Self {
            name: name.to_string(),
            before: before.to_string(),
            after: after.to_string(),
            hits,
        }
    }

    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

impl CleanupTrace {
    pub fn changed_steps(&self) -> usize {
        self.steps.iter().filter(|step| step.changed()).count()
    }

    pub fn render(&self, color: bool) -> String {
        let mut out = format!(
            "┌─ caption cleanup: {}/{} steps changed the text\n",
            self.changed_steps(),
            self.steps.len()
        );
        let _ = writeln!(out, "│ raw   {}", preview(&self.raw, color));

        for step in self.steps.iter().filter(|step| step.changed()) {
            let label = if step.hits > 0 {
                format!("{} ×{}", step.name, step.hits)
            } else {
                step.name.clone()
            };
            let _ = writeln!(out, "│ • {label}");
            for line in word_diff(&step.before, &step.after, color) {
                let _ = writeln!(out, "│     {line}");
            }
        }

        let _ = writeln!(out, "│ clean {}", preview(&self.clean, color));
        out.push_str("└─");
        out
    }
}

/// Removed words on one line and inserted words on the next. Falls back to
/// whole-value previews for long inputs.
fn word_diff(before: &str, after: &str, color: bool) -> Vec<String> {
    if before.len() + after.len() > MAX_DIFF_BYTES {
        return vec![
            format!("- {}", preview(before, color)),
            format!("+ {}", preview(after, color)),
        ];
    }

    let mut removed = String::new();
    let mut added = String::new();
    for change in TextDiff::from_words(before, after).iter_all_changes() {
        let text = visible(change.value());
        match change.tag() {
            ChangeTag::Delete if color => removed.push_str(&text.red().strikethrough().to_string()),
            ChangeTag::Delete => {
                let _ = write!(removed, "[-{text}-]");
            }
            ChangeTag::Insert if color => added.push_str(&text.green().to_string()),
            ChangeTag::Insert => {
                let _ = write!(added, "{{+{text}+}}");
            }
            ChangeTag::Equal if color => {
                let dim = text.dimmed().to_string();
                removed.push_str(&dim);
                added.push_str(&dim);
            }
            ChangeTag::Equal => {
                removed.push_str(&text);
                added.push_str(&text);
            }
        }
    }

    let mut lines = vec![format!("- {removed}")];
    if !after.is_empty() {
        lines.push(format!("+ {added}"));
    }
    lines
}

/// Makes line breaks and control characters visible on a single log line.
fn visible(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            '\n' => "⏎".to_string(),
            '\t' => "⇥".to_string(),
            '\r' => "␍".to_string(),
            c if c.is_control() => format!("\\u{{{:04X}}}", c as u32),
            c => c.to_string(),
        })
        .collect()
}

fn preview(value: &str, color: bool) -> String {
    let mut shown = visible(&value.chars().take(PREVIEW_CHARS).collect::<String>());
    if value.chars().count() > PREVIEW_CHARS {
        shown.push('…');
    }
    if color {
        shown.cyan().to_string()
    } else {
        shown
    }
}

/// Publishes `trace` on [`CLEANUP_TARGET`] at DEBUG.
pub fn emit_cleanup_trace(trace: &CleanupTrace) {
    if !tracing::enabled!(target: CLEANUP_TARGET, Level::DEBUG) {
        return;
    }
    match serde_json::to_string(trace) {
        Ok(json) => tracing::debug!(
            target: CLEANUP_TARGET,
            trace = json.as_str(),
            changed = trace.changed_steps(),
            "caption cleanup"
        ),
        Err(err) => tracing::debug!(
            target: CLEANUP_TARGET,
            "caption cleanup trace not serializable: {err}"
        ),
    }
}

#[derive(Default)]
struct TraceField(Option<String>);

impl tracing::field::Visit for TraceField {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "trace" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, _field: &tracing::field::Field, _value: &dyn fmt::Debug) {}
}

/// `date time LEVEL target: fields`, with cleanup traces expanded below the
/// line that carries them.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaptionLogFormatter;

impl<S, N> FormatEvent<S, N> for CaptionLogFormatter
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let color = writer.has_ansi_escapes();

        let clock = OffsetDateTime::now_local()
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
            .format(&CLOCK_FORMAT)
            .unwrap_or_default();
        let level = format!("{:>5}", metadata.level());
        let target = format!(
            "{:<width$}",
            metadata.target().trim_start_matches(CRATE_PREFIX),
            width = TARGET_WIDTH
        );

        if color {
            write!(
                writer,
                "{} {} {}: ",
                clock.dimmed(),
                paint_level(&level, *metadata.level()),
                target.blue()
            )?;
        } else {
            write!(writer, "{clock} {level} {target}: ")?;
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)?;

        if metadata.target() == CLEANUP_TARGET {
            let mut field = TraceField::default();
            event.record(&mut field);
            if let Some(json) = field.0 {
                match serde_json::from_str::<CleanupTrace>(&json) {
                    Ok(trace) => writeln!(writer, "{}", trace.render(color))?,
                    Err(err) => writeln!(writer, "│ unreadable cleanup trace: {err}")?,
                }
            }
        }
        Ok(())
    }
}

fn paint_level(text: &str, level: Level) -> String {
    match level {
        Level::ERROR => text.red().bold().to_string(),
        Level::WARN => text.yellow().bold().to_string(),
        Level::INFO => text.green().to_string(),
        Level::DEBUG => text.cyan().to_string(),
        Level::TRACE => text.dimmed().to_string(),
    }
}
