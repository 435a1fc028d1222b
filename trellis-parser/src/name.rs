//! Subscription name derivation.

/// Fallback slug for empty or all-punctuation handler identifiers.
const FALLBACK: &str = "subscription";

/// Derive a kebab-case slug from a handler identifier.
///
/// An uppercase letter starts a new word unless the previous character was
/// also uppercase, so acronym runs stay together: `HandleOrderCreated` →
/// `handle-order-created`, `ParseHTTP` → `parse-http`. Any other
/// non-alphanumeric character becomes a single hyphen, which also covers
/// snake_case identifiers: `handle_order_created` → `handle-order-created`.
pub fn derive_name(handler: &str) -> String {
    let mut out = String::new();
    let mut last_dash = false;
    let mut prev_upper = false;

    for c in handler.chars() {
        if c.is_uppercase() {
            if !out.is_empty() && !last_dash && !prev_upper {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            last_dash = false;
            prev_upper = true;
        } else if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_dash = false;
            prev_upper = false;
        } else {
            if !last_dash {
                out.push('-');
                last_dash = true;
            }
            prev_upper = false;
        }
    }

    let out = out.trim_matches('-');
    if out.is_empty() {
        FALLBACK.to_string()
    } else {
        out.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case() {
        assert_eq!(derive_name("HandleOrderCreated"), "handle-order-created");
        assert_eq!(derive_name("Handle"), "handle");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(derive_name("handle_order_created"), "handle-order-created");
    }

    #[test]
    fn test_acronym_runs_stay_together() {
        assert_eq!(derive_name("ParseHTTP"), "parse-http");
        assert_eq!(derive_name("HTTPHandler"), "httphandler");
    }

    #[test]
    fn test_digits() {
        assert_eq!(derive_name("HandleV2Orders"), "handle-v2-orders");
    }

    #[test]
    fn test_consecutive_separators_collapse() {
        assert_eq!(derive_name("handle__order"), "handle-order");
        assert_eq!(derive_name("_handle_"), "handle");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(derive_name(""), "subscription");
        assert_eq!(derive_name("___"), "subscription");
        assert_eq!(derive_name("--"), "subscription");
    }
}
