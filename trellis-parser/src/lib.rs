//! Directive parsing and resource extraction for Trellis NATS pub/sub.
//!
//! This crate turns `trellis:nats` annotations on handler functions into
//! validated, typed [`Subscription`](resource::Subscription) resources:
//!
//! - Directive grammar and doc-comment extraction
//! - Handler signature validation
//! - Subject grammar and field validation
//! - Defaults/override config resolution
//! - The per-unit resource registry and source scanner
//!
//! Code generation from the registry lives in `trellis-natsgen`.

pub mod config;
pub mod directive;
pub mod errors;
pub mod manifest;
pub mod name;
pub mod registry;
pub mod resource;
pub mod scan;
pub mod signature;
pub mod subject;

pub use config::{BrokerConfig, DeliveryMode, SubscriptionConfig};
pub use directive::{Directive, DirectiveRegistry, Field};
pub use errors::{ErrorSink, Pos, ResourceError};
pub use registry::ResourceRegistry;
pub use resource::{Resource, Subscription};
pub use signature::{HandlerSignature, TypeRef};
