use colored::Color;
use std::fmt;
use std::fmt::Write;
use std::fmt::{Debug, Display};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Compact event format, `[12:00:00.000 INF] owr::sources::camera{..}: message`
/// on a terminal, `2024-01-01 12:00:00.000 owr::sources::camera [I] message`
/// in files.
pub(super) struct Formatter {
    use_colors: bool,
}

impl Formatter {
    pub(super) fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }
}

fn short_target(target: &str) -> String {
    target.replacen("owr_sources", "owr", 1)
}

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let now = chrono::Local::now();
        let mut visitor = StringVisitor::default();
        event.record(&mut visitor);
        let mut spans = String::new();
        for span in ctx
            .event_scope()
            .into_iter()
            .flat_map(tracing_subscriber::registry::Scope::from_root)
        {
            let exts = span.extensions();
            let Some(fields) = exts.get::<FormattedFields<N>>() else {
                continue;
            };
            if fields.is_empty() {
                continue;
            }
            spans.push_str(if spans.is_empty() { "{" } else { " " });
            spans.push_str(fields);
        }
        if !spans.is_empty() {
            spans.push('}');
        }
        let target = short_target(meta.target());

        if self.use_colors {
            write!(
                writer,
                "[{} {}] {} {}",
                ColoredText::bright_black(now.format("%X%.3f")),
                LevelLabel::colored(meta.level()),
                ColoredText::bright_black(format!("{}{}:", target, spans)),
                visitor
            )?;
        } else {
            write!(
                writer,
                "{} {}{} {} {}",
                now.format("%F %X%.3f"),
                target,
                spans,
                LevelLabel::plain(meta.level()),
                visitor
            )?;
        }
        writeln!(writer)
    }
}

/// Renders the message first, then the remaining fields as `key=value`.
#[derive(Default)]
struct StringVisitor {
    message: String,
    fields: String,
}

impl Visit for StringVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            write!(self.fields, " {}={}", field.name(), value).ok();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            write!(self.message, "{:?}", value).ok();
        } else {
            write!(self.fields, " {}={:?}", field.name(), value).ok();
        }
    }
}

impl Display for StringVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        f.write_str(&self.fields)
    }
}

struct LevelLabel {
    label: &'static str,
    color: Option<Color>,
}

impl LevelLabel {
    fn colored(level: &Level) -> Self {
        let (label, color) = match *level {
            Level::ERROR => ("ERR", Color::BrightRed),
            Level::WARN => ("WRN", Color::BrightYellow),
            Level::INFO => ("INF", Color::BrightBlue),
            Level::DEBUG => ("DBG", Color::BrightMagenta),
            Level::TRACE => ("TRC", Color::BrightWhite),
        };
        Self {
            label,
            color: Some(color),
        }
    }
    fn plain(level: &Level) -> Self {
        let label = match *level {
            Level::ERROR => "[E]",
            Level::WARN => "[W]",
            Level::INFO => "[I]",
            Level::DEBUG => "[D]",
            Level::TRACE => "[T]",
        };
        Self { label, color: None }
    }
}

impl Display for LevelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.color {
            Some(color) => write!(f, "\x1B[{}m{}\x1B[0m", color.to_fg_str(), self.label),
            None => f.write_str(self.label),
        }
    }
}

struct ColoredText<T> {
    content: T,
    color: Color,
}

impl<T> ColoredText<T> {
    fn bright_black(value: T) -> ColoredText<T> {
        ColoredText {
            content: value,
            color: Color::BrightBlack,
        }
    }
}

impl<T: Display> Display for ColoredText<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\x1B[{}m{}\x1B[0m", self.color.to_fg_str(), self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_target() {
        assert_eq!(short_target("owr_sources::sources::camera"), "owr::sources::camera");
        assert_eq!(short_target("tokio::runtime"), "tokio::runtime");
    }

    #[test]
    fn test_level_labels() {
        assert_eq!(LevelLabel::plain(&Level::WARN).to_string(), "[W]");
        let colored = LevelLabel::colored(&Level::ERROR).to_string();
        assert!(colored.starts_with("\x1B["));
        assert!(colored.contains("ERR"));
        assert!(colored.ends_with("\x1B[0m"));
    }
}
