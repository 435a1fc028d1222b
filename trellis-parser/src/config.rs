//! Directive field validation and layered config resolution.
//!
//! Recognized fields are validated first; resolution then layers them over
//! built-in defaults into a [`SubscriptionConfig`] and a [`BrokerConfig`].
//! Stream identity is fully resolved here so downstream grouping never
//! recomputes defaults.

use std::time::Duration;

use serde::Serialize;

use crate::directive::Directive;
use crate::errors::{ErrorSink, Pos, ResourceError};
use crate::subject::check_subject;

/// Prefix for derived stream names.
const STREAM_NAMESPACE: &str = "trellis_nats_";

/// Broker delivery semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    AtLeastOnce,
    AtMostOnce,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::AtLeastOnce => "at-least-once",
            DeliveryMode::AtMostOnce => "at-most-once",
        }
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription-level timeouts and retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionConfig {
    pub ack_deadline: Duration,
    pub message_retention: Duration,
    pub min_retry_backoff: Duration,
    pub max_retry_backoff: Duration,
    pub max_retries: u32,
    pub max_concurrency: u32,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            ack_deadline: Duration::from_secs(30),
            message_retention: Duration::from_secs(7 * 24 * 60 * 60),
            min_retry_backoff: Duration::from_secs(10),
            max_retry_backoff: Duration::from_secs(10 * 60),
            max_retries: 100,
            max_concurrency: 100,
        }
    }
}

/// Broker-level delivery configuration, with stream identity resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerConfig {
    pub mode: DeliveryMode,
    pub ack_wait: Duration,
    pub max_inflight: u32,
    /// Whether `maxinflight` was set explicitly on the directive.
    pub max_inflight_set: bool,
    pub queue_group: String,
    pub stream_name: String,
    pub stream_subjects: Vec<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::AtLeastOnce,
            ack_wait: Duration::from_secs(30),
            max_inflight: 1,
            max_inflight_set: false,
            queue_group: String::new(),
            stream_name: String::new(),
            stream_subjects: Vec::new(),
        }
    }
}

fn parse_positive_duration(value: &str) -> Option<Duration> {
    humantime::parse_duration(value)
        .ok()
        .filter(|d| *d > Duration::ZERO)
}

fn parse_positive_int(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Validate every recognized field on a `nats` directive.
///
/// Unknown keys and invalid values report `FieldValidationError`s;
/// `subjects` entries additionally report `SubjectGrammarError`s. Returns
/// false if anything was reported.
pub fn validate_fields(errs: &mut ErrorSink, pos: &Pos, dir: &Directive) -> bool {
    let before = errs.len();

    for field in &dir.fields {
        match field.key.as_str() {
            "mode" => {
                if field.value != "at-most-once" && field.value != "at-least-once" {
                    errs.report(ResourceError::FieldValidation {
                        pos: pos.clone(),
                        message: format!(
                            "nats: invalid mode {:?} (expected at-most-once or at-least-once)",
                            field.value
                        ),
                    });
                }
            }
            "ackwait" => {
                if parse_positive_duration(&field.value).is_none() {
                    errs.report(ResourceError::FieldValidation {
                        pos: pos.clone(),
                        message: format!("nats: invalid ackwait {:?}", field.value),
                    });
                }
            }
            "maxinflight" => {
                if parse_positive_int(&field.value).is_none() {
                    errs.report(ResourceError::FieldValidation {
                        pos: pos.clone(),
                        message: format!("nats: invalid maxinflight {:?}", field.value),
                    });
                }
            }
            "queue" | "stream" => {
                if field.value.trim().is_empty() {
                    errs.report(ResourceError::FieldValidation {
                        pos: pos.clone(),
                        message: format!("nats: {} cannot be empty", field.key),
                    });
                }
            }
            "subjects" => {
                for entry in field.value.split(',') {
                    let entry = entry.trim();
                    if let Err(msg) = check_subject(entry) {
                        errs.report(ResourceError::SubjectGrammar {
                            pos: pos.clone(),
                            message: format!("nats: invalid subjects entry {:?}: {}", entry, msg),
                        });
                    }
                }
            }
            _ => {
                errs.report(ResourceError::FieldValidation {
                    pos: pos.clone(),
                    message: format!("nats: unknown field {:?}", field.key),
                });
            }
        }
    }

    errs.len() == before
}

/// Layer directive fields over defaults into the two resolved configs.
///
/// Assumes [`validate_fields`] has already passed; unparseable values are
/// ignored in favor of the default rather than trusted.
pub fn resolve(dir: &Directive, subject: &str) -> (SubscriptionConfig, BrokerConfig) {
    let mut cfg = SubscriptionConfig::default();
    let mut broker = BrokerConfig::default();

    if dir.get("mode").trim() == DeliveryMode::AtMostOnce.as_str() {
        broker.mode = DeliveryMode::AtMostOnce;
    }
    if let Some(d) = parse_positive_duration(dir.get("ackwait").trim()) {
        cfg.ack_deadline = d;
        broker.ack_wait = d;
    }
    if let Some(n) = parse_positive_int(dir.get("maxinflight").trim()) {
        cfg.max_concurrency = n;
        broker.max_inflight = n;
        broker.max_inflight_set = true;
    }
    broker.queue_group = dir.get("queue").trim().to_string();
    broker.stream_name = dir.get("stream").trim().to_string();
    broker.stream_subjects = dir
        .get("subjects")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    apply_stream_defaults(&mut broker, subject);
    (cfg, broker)
}

/// Fill in stream identity: explicit `stream` + `subjects` are used
/// verbatim; missing pieces derive from the subject.
fn apply_stream_defaults(broker: &mut BrokerConfig, subject: &str) {
    if !broker.stream_name.is_empty() && !broker.stream_subjects.is_empty() {
        return;
    }
    let subject = subject.trim();
    if broker.stream_name.is_empty() {
        broker.stream_name = format!(
            "{}{}",
            STREAM_NAMESPACE,
            sanitize_stream_ident(&subject.replace('.', "_"))
        );
    }
    if broker.stream_subjects.is_empty() {
        broker.stream_subjects = vec![subject.to_string()];
    }
}

fn sanitize_stream_ident(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if c.is_ascii_uppercase() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    let out = out.trim_matches('_');
    if out.is_empty() {
        "events".to_string()
    } else {
        out.to_string()
    }
}
