use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt::{
        self,
        format::{Format, FormatEvent, FormatFields, Writer},
        time::SystemTime,
        FmtContext,
    },
    registry::LookupSpan,
};

/// Deepest nesting rendered before the tree stops indenting.
const MAX_INDENT: usize = 6;

/// Indents each event under the spans it happened in, so a run reads as a tree:
///
/// ```text
/// 2026-10-18T12:30:05Z  INFO Portfolio: 📊 12 holdings, total value 24246.91 USDT
///   └─2026-10-18T12:30:06Z  INFO Sheets: ✅ Wrote 16 rows to 'Portfolio'
/// ```
pub struct PrettyFormatter {
    inner: Format<fmt::format::Full, SystemTime>,
}

impl PrettyFormatter {
    /// `ansi` colours the level and span names; leave it off for log files.
    pub fn new(ansi: bool) -> Self {
        Self {
            inner: fmt::format()
                .with_ansi(ansi)
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .with_level(true)
                .with_source_location(false),
        }
    }
}

impl<S, N> FormatEvent<S, N> for PrettyFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let depth = ctx.event_scope().map(|scope| scope.count()).unwrap_or(0);

        for _ in 1..depth.min(MAX_INDENT) {
            write!(writer, "  ")?;
        }
        if depth > 0 {
            write!(writer, "└─")?;
        }

        self.inner.format_event(ctx, writer, event)
    }
}
