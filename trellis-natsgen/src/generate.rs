//! Subscription wiring emission.
//!
//! Generates the `wire_subscriptions` function binding every handler to its
//! deduplicated topic. Output is a pure function of the registry: identical
//! input yields byte-identical text.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use tracing::debug;

use trellis_parser::{DeliveryMode, ErrorSink, ResourceRegistry};

use crate::group::{group_subscriptions, TopicGroup};

/// Header prepended to every generated file.
pub const GENERATED_HEADER: &str = "// Code generated by trellis-natsgen. DO NOT EDIT.\n\n";

fn runtime(item: &str) -> TokenStream {
    let root = format_ident!("trellis_runtime");
    let module = format_ident!("nats");
    let item = format_ident!("{}", item);
    quote! { #root::#module::#item }
}

fn path_tokens(path: &str) -> TokenStream {
    let segments = path.split("::").map(|seg| format_ident!("{}", seg));
    quote! { #(#segments)::* }
}

/// Dedup-safe subscription name: derived slug plus lower-cased handler
/// identifier.
pub fn unique_name(base: &str, handler: &str) -> String {
    let base = base.trim();
    let base = if base.is_empty() { "subscription" } else { base };
    let handler = handler.trim();
    if handler.is_empty() {
        base.to_string()
    } else {
        format!("{}-{}", base, handler.to_lowercase())
    }
}

fn topic_statements(group: &TopicGroup) -> Vec<TokenStream> {
    let var = format_ident!("topic{}", group.index);
    let payload = path_tokens(&group.message_type.path);
    let subject = group.key.subject.as_str();
    let mode = match group.key.mode {
        DeliveryMode::AtLeastOnce => {
            let path = runtime("DeliveryMode");
            quote! { #path::AtLeastOnce }
        }
        DeliveryMode::AtMostOnce => {
            let path = runtime("DeliveryMode");
            quote! { #path::AtMostOnce }
        }
    };
    let ack_wait_nanos = group.key.ack_wait.as_nanos() as u64;
    let max_inflight = group.key.max_inflight;
    let queue_group = group.key.queue_group.as_str();
    let stream_name = group.broker.stream_name.as_str();
    let stream_subjects = group.broker.stream_subjects.iter().map(String::as_str);
    let topic_ty = runtime("Topic");
    let options_ty = runtime("TopicOptions");

    let mut stmts = vec![quote! {
        let #var = #topic_ty::<#payload>::new(
            client,
            #subject,
            #options_ty {
                mode: #mode,
                ack_wait: std::time::Duration::from_nanos(#ack_wait_nanos),
                max_inflight: #max_inflight,
                queue_group: #queue_group,
                stream_name: #stream_name,
                stream_subjects: &[#(#stream_subjects),*],
            },
        );
    }];

    for sub in &group.subscriptions {
        let name = unique_name(&sub.name, &sub.handler_name);
        let handler = path_tokens(&sub.handler_name);
        stmts.push(quote! {
            #var.subscribe(#name, #handler)?;
        });
    }
    stmts
}

/// Generate the wiring code for one unit.
///
/// Fail-closed: returns `None` without emitting anything when the sink
/// already holds errors, when grouping finds a payload conflict, or when
/// the registry holds no subscriptions.
pub fn generate(errs: &mut ErrorSink, registry: &ResourceRegistry) -> Option<String> {
    if !errs.is_empty() {
        debug!(errors = errs.len(), "generation withheld: outstanding errors");
        return None;
    }
    let subs = registry.subscriptions();
    if subs.is_empty() {
        return None;
    }

    let groups = group_subscriptions(errs, &subs);
    if !errs.is_empty() {
        debug!(errors = errs.len(), "generation withheld: payload conflicts");
        return None;
    }

    let statements: Vec<TokenStream> = groups.iter().flat_map(|g| topic_statements(g)).collect();
    let client_ty = runtime("Client");
    let error_ty = runtime("SubscribeError");

    let wire_fn: syn::ItemFn = syn::parse_quote! {
        /// Bind every subscription in this unit to its topic. Run once at
        /// process initialization; a subscribe failure aborts startup.
        pub fn wire_subscriptions(client: &#client_ty) -> Result<(), #error_ty> {
            #(#statements)*
            Ok(())
        }
    };
    let file = syn::File {
        shebang: None,
        attrs: Vec::new(),
        items: vec![syn::Item::Fn(wire_fn)],
    };

    debug!(
        topics = groups.len(),
        subscriptions = subs.len(),
        "generated nats wiring"
    );
    Some(format!("{}{}", GENERATED_HEADER, prettyplease::unparse(&file)))
}
