//! Per-unit resource registry.
//!
//! Bindings (handler identifiers) map to resources in insertion order. The
//! registry is built incrementally while files are scanned and read-only
//! once the scan returns it.

use std::collections::HashMap;

use crate::errors::{ErrorSink, ResourceError};
use crate::resource::{Resource, Subscription};

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    order: Vec<String>,
    by_binding: HashMap<String, Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under its binding identifier.
    ///
    /// A duplicate binding within one unit is a `PlacementError` naming the
    /// first declaration site; the second resource is dropped.
    pub fn insert(&mut self, errs: &mut ErrorSink, binding: &str, resource: Resource) -> bool {
        if let Some(existing) = self.by_binding.get(binding) {
            errs.report(ResourceError::Placement {
                pos: resource.pos().clone(),
                message: format!(
                    "binding {:?} is already declared in this unit (first declared at {})",
                    binding,
                    existing.pos()
                ),
            });
            return false;
        }
        self.order.push(binding.to_string());
        self.by_binding.insert(binding.to_string(), resource);
        true
    }

    pub fn get(&self, binding: &str) -> Option<&Resource> {
        self.by_binding.get(binding)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate bindings and resources in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.order
            .iter()
            .filter_map(|binding| {
                self.by_binding
                    .get(binding)
                    .map(|res| (binding.as_str(), res))
            })
    }

    /// All subscriptions in insertion order.
    pub fn subscriptions(&self) -> Vec<&Subscription> {
        self.iter()
            .map(|(_, res)| match res {
                Resource::Subscription(sub) => sub,
            })
            .collect()
    }

    /// Fold a worker's partial registry into this one, reporting duplicate
    /// bindings across files.
    pub fn merge(&mut self, errs: &mut ErrorSink, other: ResourceRegistry) {
        let ResourceRegistry { order, mut by_binding } = other;
        for binding in order {
            if let Some(resource) = by_binding.remove(&binding) {
                self.insert(errs, &binding, resource);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Pos;
    use crate::signature::TypeRef;

    fn sub(name: &str, file: &str) -> Resource {
        Resource::Subscription(Subscription {
            name: name.into(),
            handler_name: name.replace('-', "_"),
            subject: "orders.created".into(),
            doc: String::new(),
            message_type: TypeRef {
                ident: "OrderCreated".into(),
                path: "OrderCreated".into(),
            },
            reply_type: None,
            config: Default::default(),
            broker: Default::default(),
            pos: Pos::new(file, 1, 1),
        })
    }

    #[test]
    fn test_insertion_order() {
        let mut errs = ErrorSink::new();
        let mut reg = ResourceRegistry::new();
        reg.insert(&mut errs, "b_handler", sub("b-handler", "b.rs"));
        reg.insert(&mut errs, "a_handler", sub("a-handler", "a.rs"));

        let names: Vec<&str> = reg.iter().map(|(binding, _)| binding).collect();
        assert_eq!(names, vec!["b_handler", "a_handler"]);
    }

    #[test]
    fn test_duplicate_binding() {
        let mut errs = ErrorSink::new();
        let mut reg = ResourceRegistry::new();
        assert!(reg.insert(&mut errs, "h", sub("h", "a.rs")));
        assert!(!reg.insert(&mut errs, "h", sub("h", "b.rs")));
        assert_eq!(reg.len(), 1);
        let rendered = errs.format_errors();
        assert!(rendered.contains("already declared in this unit"), "got: {}", rendered);
        assert!(rendered.contains("a.rs:1:1"), "got: {}", rendered);
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut errs = ErrorSink::new();
        let mut a = ResourceRegistry::new();
        a.insert(&mut errs, "one", sub("one", "a.rs"));

        let mut b = ResourceRegistry::new();
        b.insert(&mut errs, "two", sub("two", "b.rs"));
        b.insert(&mut errs, "three", sub("three", "b.rs"));

        a.merge(&mut errs, b);
        assert!(errs.is_empty());
        let names: Vec<&str> = a.iter().map(|(binding, _)| binding).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
    }
}
