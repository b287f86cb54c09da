//! Structured audit logger (spec.md §4.9): splits audit records onto their
//! own JSON-lines stream, separate from the human-readable operational log.
//!
//! Grounded on `original_source/logger.py` (`AuditFormatter.format`,
//! `_should_log_for_user`, the `audit`/`root` dict-config handler split) for
//! the record shape and the "route by one boolean flag" design, layered onto
//! the `tracing`/`tracing-subscriber` stack already used for operational
//! logging (`crab_city/src/main.rs`'s `EnvFilter` + `fmt::layer()` setup).

mod error;
pub use error::AuditError;

use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

/// Constant `syslog_identifier` field (spec.md §4.9).
const SYSLOG_IDENTIFIER: &str = "command_line_assistant";
/// Constant `audit_type` field (spec.md §4.9).
const AUDIT_TYPE: &str = "cla-audit";

/// Maps a tracing level to its syslog numeric priority.
fn syslog_priority(level: &tracing::Level) -> u8 {
    match *level {
        tracing::Level::ERROR => 3,
        tracing::Level::WARN => 4,
        tracing::Level::INFO => 6,
        tracing::Level::DEBUG | tracing::Level::TRACE => 7,
    }
}

/// Collects every field attached to an event into a JSON map, tracking the
/// well-known keys (`message`, `user_id`) separately so the rest can be
/// folded into `audit_data`.
#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    user_id: Option<String>,
    extra: Map<String, Value>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field, Value::String(format!("{value:?}")));
    }
}

impl FieldCollector {
    fn record(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => {
                self.message = value.as_str().map(str::to_string).or(self.message.take())
            }
            "user_id" => self.user_id = value.as_str().map(str::to_string),
            "audit" => {} // routing-only, not part of the record body
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }
}

/// A `tracing_subscriber::Layer` that renders every event carrying an
/// `audit = true` field as one JSON object per line, matching spec.md §4.9's
/// key set exactly.
pub struct AuditLayer<W: Write + Send + 'static> {
    writer: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> AuditLayer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

impl<S, W> Layer<S> for AuditLayer<W>
where
    S: Subscriber,
    W: Write + Send + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let metadata = event.metadata();
        let record = serde_json::json!({
            "priority": syslog_priority(metadata.level()),
            "message": collector.message.unwrap_or_default(),
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "syslog_identifier": SYSLOG_IDENTIFIER,
            "code": {
                "file": metadata.file().unwrap_or("unknown"),
                "line": metadata.line().unwrap_or(0),
                "function": metadata.target(),
            },
            "user_id": collector.user_id,
            "audit_type": AUDIT_TYPE,
            "level": metadata.level().as_str(),
            "audit_data": collector.extra,
        });

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{record}");
            let _ = writer.flush();
        }
    }
}

/// A call site carries an `audit` field if and only if it is meant for the
/// audit channel; this is the one boolean flag spec.md §4.9 describes, and
/// the predicate below is how the console/audit split happens "at handler
/// level so a record never appears on both channels."
fn declares_audit_field(metadata: &tracing::Metadata<'_>) -> bool {
    metadata.fields().field("audit").is_some()
}

/// Installs the global subscriber: an operational console layer (filtered by
/// `level` and excluding audit records) plus the audit JSON layer (only
/// audit records). Mirrors `crab_city::main::run_server`'s tracing init,
/// generalized with the audit split.
pub fn init<W: Write + Send + 'static>(level: &str, audit_writer: W) -> Result<(), AuditError> {
    let env_filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            !declares_audit_field(metadata)
        }))
        .with_filter(env_filter);

    let audit_layer = AuditLayer::new(audit_writer).with_filter(
        tracing_subscriber::filter::filter_fn(declares_audit_field),
    );

    tracing_subscriber::registry()
        .with(console_layer)
        .with(audit_layer)
        .try_init()
        .map_err(|e| AuditError::SubscriberInit(e.to_string()))
}

/// Logs which audit-verbosity policy is active, per spec.md §9's Open
/// Question resolution (DESIGN.md): the daemon always announces this at
/// startup, an ordinary (non-audit) info line.
pub fn log_active_policy(verbose: bool) {
    tracing::info!(
        audit_verbose = verbose,
        "audit policy: {}",
        if verbose {
            "verbose (question/response bodies included)"
        } else {
            "terse (only lengths recorded)"
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::prelude::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn audit_event_is_routed_to_the_audit_layer_only() {
        let audit_buf = SharedBuf::default();
        let console_buf = SharedBuf::default();

        let audit_layer = AuditLayer::new(audit_buf.clone())
            .with_filter(tracing_subscriber::filter::filter_fn(declares_audit_field));
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(move || console_buf.clone())
            .with_filter(tracing_subscriber::filter::filter_fn(|m| {
                !declares_audit_field(m)
            }));

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(audit_layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(audit = true, user_id = "abc-123", question_length = 12, "ask");
            tracing::info!("ordinary operational line");
        });

        let audit_out = String::from_utf8(audit_buf.0.lock().unwrap().clone()).unwrap();
        assert!(audit_out.contains("\"audit_type\":\"cla-audit\""));
        assert!(audit_out.contains("\"user_id\":\"abc-123\""));
        assert!(audit_out.contains("\"question_length\":12"));
        assert_eq!(audit_out.lines().count(), 1);
    }

    #[test]
    fn priority_mapping_matches_syslog_numbers() {
        assert_eq!(syslog_priority(&tracing::Level::ERROR), 3);
        assert_eq!(syslog_priority(&tracing::Level::WARN), 4);
        assert_eq!(syslog_priority(&tracing::Level::INFO), 6);
        assert_eq!(syslog_priority(&tracing::Level::DEBUG), 7);
    }
}
