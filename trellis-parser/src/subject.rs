//! NATS subject grammar validation.
//!
//! Subjects are dot-separated token lists over `[A-Za-z0-9._*>-]`, where a
//! `*` token matches exactly one token and a trailing `>` token matches the
//! rest of the subject. The same rules apply to every entry of a
//! `subjects=` stream-subject list.

/// Validate a subject, returning the first violation as a message.
pub fn check_subject(subject: &str) -> Result<(), String> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err("subject cannot be empty".into());
    }
    if !subject
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '*' | '>' | '-'))
    {
        return Err("subject contains invalid characters".into());
    }

    let tokens: Vec<&str> = subject.split('.').collect();
    let last = tokens.len() - 1;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_empty() {
            return Err("subject cannot contain empty tokens".into());
        }
        if tok.chars().any(char::is_whitespace) {
            return Err(format!("subject token {:?} contains whitespace", tok));
        }
        if tok.contains('>') && *tok != ">" {
            return Err(format!("token {:?} contains invalid > wildcard usage", tok));
        }
        if tok.contains('*') && *tok != "*" {
            return Err(format!("token {:?} contains invalid * wildcard usage", tok));
        }
        if *tok == ">" && i != last {
            return Err("> wildcard is only allowed as the final token".into());
        }
    }
    Ok(())
}
