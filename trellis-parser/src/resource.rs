//! The subscription resource and its assembly from a validated directive.

use serde::Serialize;

use crate::config::{self, BrokerConfig, SubscriptionConfig};
use crate::directive::DirectiveInput;
use crate::errors::{ErrorSink, Pos, ResourceError};
use crate::name::derive_name;
use crate::signature::{validate_handler, TypeRef};
use crate::subject::check_subject;

/// A handler's validated, resolved binding to a subject. Immutable once
/// assembled; corrections require a fresh parse pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    /// Kebab-case slug derived from the handler identifier.
    pub name: String,
    /// Declared identifier of the handler function.
    pub handler_name: String,
    /// Validated subject string.
    pub subject: String,
    /// Non-directive doc text preserved from the declaration.
    pub doc: String,
    pub message_type: TypeRef,
    /// Present only for request-reply handlers.
    pub reply_type: Option<TypeRef>,
    pub config: SubscriptionConfig,
    pub broker: BrokerConfig,
    pub pos: Pos,
}

/// Closed set of resource kinds this subsystem produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Subscription(Subscription),
}

impl Resource {
    pub fn name(&self) -> &str {
        match self {
            Resource::Subscription(sub) => &sub.name,
        }
    }

    pub fn pos(&self) -> &Pos {
        match self {
            Resource::Subscription(sub) => &sub.pos,
        }
    }
}

/// Assemble a [`Subscription`] from a parsed `nats` directive.
///
/// Runs the sub-validators in order and reports the first failure into the
/// sink, returning `None` so the scan continues with the next candidate.
pub fn parse_subscription(errs: &mut ErrorSink, input: DirectiveInput<'_>) -> Option<Resource> {
    let dir = input.directive;

    if !dir.tags.is_empty() {
        errs.report(ResourceError::DirectiveSyntax {
            pos: input.pos.clone(),
            message: "nats directive does not support tags".into(),
        });
        return None;
    }
    if dir.options.len() != 1 {
        errs.report(ResourceError::DirectiveSyntax {
            pos: input.pos.clone(),
            message: format!(
                "nats directive requires exactly one subject argument, got {}",
                dir.options.len()
            ),
        });
        return None;
    }

    let subject = dir.options[0].value.as_str();
    if let Err(msg) = check_subject(subject) {
        errs.report(ResourceError::SubjectGrammar {
            pos: input.pos.clone(),
            message: format!("invalid nats subject {:?}: {}", subject, msg),
        });
        return None;
    }

    let (message_type, reply_type) = validate_handler(errs, input.signature)?;

    if !config::validate_fields(errs, input.pos, dir) {
        return None;
    }
    let (cfg, broker) = config::resolve(dir, subject);

    Some(Resource::Subscription(Subscription {
        name: derive_name(input.handler_name),
        handler_name: input.handler_name.to_string(),
        subject: subject.to_string(),
        doc: input.doc.to_string(),
        message_type,
        reply_type,
        config: cfg,
        broker,
        pos: input.pos.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeliveryMode;
    use crate::directive::{parse_directive, Directive};
    use crate::signature::HandlerSignature;
    use std::time::Duration;

    fn pos() -> Pos {
        Pos::new("orders.rs", 10, 1)
    }

    fn handler_sig() -> HandlerSignature {
        let sig: syn::Signature = syn::parse_str(
            "fn handle_order_created(ctx: &Context, msg: &OrderCreated) -> Result<(), HandlerError>",
        )
        .expect("signature parses");
        HandlerSignature::from_syn(&sig, pos())
    }

    fn assemble(dir: &Directive, sig: &HandlerSignature) -> (Option<Resource>, ErrorSink) {
        let mut errs = ErrorSink::new();
        let pos = pos();
        let out = parse_subscription(
            &mut errs,
            DirectiveInput {
                directive: dir,
                signature: sig,
                handler_name: "handle_order_created",
                doc: "handler docs",
                pos: &pos,
            },
        );
        (out, errs)
    }

    fn dir_of(line: &str) -> Directive {
        let mut errs = ErrorSink::new();
        parse_directive(&mut errs, &pos(), line).expect("directive parses")
    }

    #[test]
    fn test_valid_subscription_with_defaults() {
        let (out, errs) = assemble(&dir_of("nats orders.created"), &handler_sig());
        assert!(errs.is_empty(), "{}", errs.format_errors());

        let Resource::Subscription(sub) = out.expect("subscription");
        assert_eq!(sub.name, "handle-order-created");
        assert_eq!(sub.handler_name, "handle_order_created");
        assert_eq!(sub.subject, "orders.created");
        assert_eq!(sub.doc, "handler docs");
        assert_eq!(sub.message_type.ident, "OrderCreated");
        assert!(sub.reply_type.is_none());
        assert_eq!(sub.broker.mode, DeliveryMode::AtLeastOnce);
        assert_eq!(sub.broker.ack_wait, Duration::from_secs(30));
        assert_eq!(sub.broker.max_inflight, 1);
    }

    #[test]
    fn test_missing_subject_option() {
        let (out, errs) = assemble(&dir_of("nats"), &handler_sig());
        assert!(out.is_none());
        assert!(errs.format_errors().contains("exactly one subject argument"));
    }

    #[test]
    fn test_two_subject_options() {
        let (out, errs) = assemble(&dir_of("nats orders.created orders.updated"), &handler_sig());
        assert!(out.is_none());
        assert!(errs.format_errors().contains("got 2"));
    }

    #[test]
    fn test_tags_rejected() {
        let (out, errs) = assemble(&dir_of("nats orders.created tag:foo"), &handler_sig());
        assert!(out.is_none());
        assert!(errs.format_errors().contains("does not support tags"));
    }

    #[test]
    fn test_invalid_subject() {
        let (out, errs) = assemble(&dir_of("nats orders..created"), &handler_sig());
        assert!(out.is_none());
        let rendered = errs.format_errors();
        assert!(rendered.contains(r#"invalid nats subject "orders..created""#), "got: {}", rendered);
    }

    #[test]
    fn test_unknown_field_registers_nothing() {
        let (out, errs) = assemble(&dir_of("nats orders.created foo=bar"), &handler_sig());
        assert!(out.is_none());
        assert!(errs.format_errors().contains(r#"unknown field "foo""#));
    }

    #[test]
    fn test_invalid_signature_reports_and_skips() {
        let sig: syn::Signature =
            syn::parse_str("fn bad(ctx: &Context, msg: &OrderCreated) -> String")
                .expect("signature parses");
        let lowered = HandlerSignature::from_syn(&sig, pos());
        let (out, errs) = assemble(&dir_of("nats orders.created"), &lowered);
        assert!(out.is_none());
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn test_reply_type_captured() {
        let sig: syn::Signature = syn::parse_str(
            "fn quote(ctx: &Context, msg: &QuoteRequest) -> Result<QuoteReply, HandlerError>",
        )
        .expect("signature parses");
        let lowered = HandlerSignature::from_syn(&sig, pos());
        let (out, errs) = assemble(&dir_of("nats quotes.requested"), &lowered);
        assert!(errs.is_empty(), "{}", errs.format_errors());

        let Resource::Subscription(sub) = out.expect("subscription");
        assert_eq!(sub.reply_type.expect("reply").ident, "QuoteReply");
    }
}
