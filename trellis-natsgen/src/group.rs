//! Topic deduplication.
//!
//! Subscriptions sharing one broker configuration share one generated
//! topic. Groups are recomputed in full on every generation pass so they
//! always reflect the current registry contents.

use std::collections::HashMap;
use std::time::Duration;

use trellis_parser::{
    BrokerConfig, DeliveryMode, ErrorSink, ResourceError, Subscription, TypeRef,
};

/// Identity of one broker topic. Two subscriptions with equal keys bind to
/// the same generated topic declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicKey {
    pub subject: String,
    pub stream_name: String,
    /// Sorted for identity; emission uses the resolved order.
    pub stream_subjects: Vec<String>,
    pub mode: DeliveryMode,
    pub ack_wait: Duration,
    pub max_inflight: u32,
    pub queue_group: String,
}

impl TopicKey {
    pub fn of(sub: &Subscription) -> Self {
        let mut subjects = sub.broker.stream_subjects.clone();
        subjects.sort();
        Self {
            subject: sub.subject.clone(),
            stream_name: sub.broker.stream_name.clone(),
            stream_subjects: subjects,
            mode: sub.broker.mode,
            ack_wait: sub.broker.ack_wait,
            max_inflight: effective_max_inflight(&sub.broker),
            queue_group: sub.broker.queue_group.clone(),
        }
    }
}

/// The max-inflight value the topic is constructed with: the explicit
/// override when one was given, else 1.
pub fn effective_max_inflight(broker: &BrokerConfig) -> u32 {
    if !broker.max_inflight_set || broker.max_inflight == 0 {
        1
    } else {
        broker.max_inflight
    }
}

/// One deduplicated topic plus the subscriptions bound to it, in sorted
/// order.
#[derive(Debug)]
pub struct TopicGroup {
    /// 1-based discovery index; names the generated topic (`topic1`, ...).
    pub index: usize,
    pub key: TopicKey,
    pub message_type: TypeRef,
    /// Resolved broker config of the group's first subscription, carrying
    /// stream subjects in resolved (unsorted) order.
    pub broker: BrokerConfig,
    pub subscriptions: Vec<Subscription>,
}

/// Sort subscriptions by `(subject, name)`, verify payload identity per
/// subject, and fold them into topic groups in discovery order.
///
/// A subscription whose message type differs from the first one recorded
/// for its subject reports a `TypeConflictError` naming both declaration
/// sites and joins no group.
pub fn group_subscriptions(errs: &mut ErrorSink, subs: &[&Subscription]) -> Vec<TopicGroup> {
    let mut sorted: Vec<&Subscription> = subs.to_vec();
    sorted.sort_by(|a, b| a.subject.cmp(&b.subject).then_with(|| a.name.cmp(&b.name)));

    let mut groups: Vec<TopicGroup> = Vec::new();
    let mut index_by_key: HashMap<TopicKey, usize> = HashMap::new();
    let mut first_by_subject: HashMap<String, &Subscription> = HashMap::new();

    for sub in sorted {
        match first_by_subject.get(sub.subject.as_str()) {
            Some(first) if first.message_type != sub.message_type => {
                errs.report(ResourceError::TypeConflict {
                    pos: sub.pos.clone(),
                    message: format!(
                        "nats subject {:?} is used with incompatible message types: {} here, {} at {}",
                        sub.subject,
                        sub.message_type.path,
                        first.message_type.path,
                        first.pos
                    ),
                });
                continue;
            }
            Some(_) => {}
            None => {
                first_by_subject.insert(sub.subject.clone(), sub);
            }
        }

        let key = TopicKey::of(sub);
        match index_by_key.get(&key) {
            Some(&slot) => groups[slot].subscriptions.push(sub.clone()),
            None => {
                index_by_key.insert(key.clone(), groups.len());
                groups.push(TopicGroup {
                    index: groups.len() + 1,
                    key,
                    message_type: sub.message_type.clone(),
                    broker: sub.broker.clone(),
                    subscriptions: vec![sub.clone()],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_parser::Pos;

    fn sub(handler: &str, subject: &str, message: &str, file: &str) -> Subscription {
        let directive = {
            let mut errs = ErrorSink::new();
            trellis_parser::directive::parse_directive(
                &mut errs,
                &Pos::new(file, 1, 1),
                &format!("nats {}", subject),
            )
            .expect("directive parses")
        };
        let (config, broker) = trellis_parser::config::resolve(&directive, subject);
        Subscription {
            name: trellis_parser::name::derive_name(handler),
            handler_name: handler.into(),
            subject: subject.into(),
            doc: String::new(),
            message_type: TypeRef {
                ident: message.into(),
                path: message.into(),
            },
            reply_type: None,
            config,
            broker,
            pos: Pos::new(file, 1, 1),
        }
    }

    #[test]
    fn test_identical_configs_share_a_group() {
        let a = sub("handle_a", "orders.created", "OrderCreated", "a.rs");
        let b = sub("handle_b", "orders.created", "OrderCreated", "b.rs");
        let mut errs = ErrorSink::new();
        let groups = group_subscriptions(&mut errs, &[&a, &b]);
        assert!(errs.is_empty(), "{}", errs.format_errors());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].subscriptions.len(), 2);
        assert_eq!(groups[0].index, 1);
    }

    #[test]
    fn test_different_subjects_get_separate_groups() {
        let a = sub("handle_a", "orders.created", "OrderCreated", "a.rs");
        let b = sub("handle_b", "orders.shipped", "OrderShipped", "b.rs");
        let mut errs = ErrorSink::new();
        let groups = group_subscriptions(&mut errs, &[&b, &a]);
        assert!(errs.is_empty());
        assert_eq!(groups.len(), 2);
        // Discovery order follows the (subject, name) sort.
        assert_eq!(groups[0].key.subject, "orders.created");
        assert_eq!(groups[1].key.subject, "orders.shipped");
    }

    #[test]
    fn test_queue_group_splits_topics() {
        let a = sub("handle_a", "orders.created", "OrderCreated", "a.rs");
        let mut b = sub("handle_b", "orders.created", "OrderCreated", "b.rs");
        b.broker.queue_group = "workers".into();
        let mut errs = ErrorSink::new();
        let groups = group_subscriptions(&mut errs, &[&a, &b]);
        assert!(errs.is_empty());
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_payload_conflict_reports_both_sites() {
        let a = sub("handle_a", "orders.created", "OrderCreated", "a.rs");
        let b = sub("handle_b", "orders.created", "LegacyOrder", "b.rs");
        let mut errs = ErrorSink::new();
        let groups = group_subscriptions(&mut errs, &[&a, &b]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].subscriptions.len(), 1);

        let rendered = errs.format_errors();
        assert!(rendered.contains("incompatible message types"), "got: {}", rendered);
        assert!(rendered.starts_with("b.rs:1:1"), "got: {}", rendered);
        assert!(rendered.contains("a.rs:1:1"), "got: {}", rendered);
    }

    #[test]
    fn test_effective_max_inflight_defaults_to_one() {
        let mut broker = BrokerConfig::default();
        broker.max_inflight = 64;
        broker.max_inflight_set = false;
        assert_eq!(effective_max_inflight(&broker), 1);

        broker.max_inflight_set = true;
        assert_eq!(effective_max_inflight(&broker), 64);
    }

    #[test]
    fn test_key_sorts_stream_subjects() {
        let mut a = sub("handle_a", "orders.created", "OrderCreated", "a.rs");
        a.broker.stream_subjects = vec!["b.subject".into(), "a.subject".into()];
        let mut b = sub("handle_b", "orders.created", "OrderCreated", "b.rs");
        b.broker.stream_subjects = vec!["a.subject".into(), "b.subject".into()];
        assert_eq!(TopicKey::of(&a), TopicKey::of(&b));
    }
}
