//! Simulation-aware tracing setup.
//!
//! The kernel emits all diagnostics through [`tracing`]; this module wires
//! up a subscriber whose formatter prefixes every record with the current
//! simulation time instead of the wall clock. Models are free to install
//! their own subscriber instead; nothing in the kernel depends on this one.

use nu_ansi_term::{Color, Style};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    filter::Directive,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

/// The log level that will be used if `RUST_LOG` is not defined.
pub const FALLBACK_LOG_LEVEL: Level = Level::INFO;

/// Creates a new tracing subscriber with a sim formatter and installs it
/// globally.
///
/// # Panics
///
/// Panics when subscriber initialization fails, e.g. because another
/// subscriber is already installed.
pub fn init() {
    let subscriber = tracing_subscriber::fmt();
    let subscriber = subscriber.event_format(format());
    let subscriber = subscriber.with_env_filter(
        EnvFilter::builder()
            .with_default_directive(Directive::from(FALLBACK_LOG_LEVEL))
            .from_env_lossy(),
    );
    subscriber.finish().init();
}

/// An instance of a simulation formatter.
#[must_use]
pub fn format() -> SimFormat {
    SimFormat::default()
}

///
/// A formatter that prefixes tracing messages with the simulation time of
/// the event being executed when the record was emitted.
///
#[derive(Debug, Default)]
pub struct SimFormat {
    _priv: (),
}

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        let time = crate::time::observed_now();
        write!(
            writer,
            "{} ",
            Style::new().dimmed().paint(format!("[ {time:>12} ]"))
        )?;

        let level = match *meta.level() {
            Level::ERROR => Color::Red.bold().paint("ERROR"),
            Level::WARN => Color::Yellow.bold().paint(" WARN"),
            Level::INFO => Color::Green.paint(" INFO"),
            Level::DEBUG => Color::Blue.paint("DEBUG"),
            Level::TRACE => Color::Purple.paint("TRACE"),
        };
        write!(writer, "{level} ")?;
        write!(
            writer,
            "{}: ",
            Style::new().dimmed().paint(meta.target())
        )?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
