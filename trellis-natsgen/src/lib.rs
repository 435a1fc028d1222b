//! NATS topic deduplication and subscription wiring codegen for Trellis.
//!
//! Takes the resource registry produced by `trellis-parser` and emits the
//! process-initialization code binding every handler to its topic:
//!
//! - One topic construction per distinct broker configuration
//! - One subscribe statement per subscription
//! - Deterministic, diff-stable output
//!
//! Generation is gated on an empty error sink; it never partially emits.

pub mod generate;
pub mod group;

pub use generate::{generate, unique_name, GENERATED_HEADER};
pub use group::{group_subscriptions, TopicGroup, TopicKey};
