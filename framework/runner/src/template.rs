use std::path::PathBuf;

/// Replace every occurrence of `token` with `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub token: String,
    pub value: String,
}

impl Substitution {
    pub fn new(token: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unresolved placeholders in {}: {}", .path.display(), .tokens.join(", "))]
    Unresolved { path: PathBuf, tokens: Vec<String> },
}

/// Apply all substitutions to `content` in one pass.
///
/// Replacement values are never scanned again, so the result does not depend on the order of
/// `substitutions`. Where two tokens start at the same position the longer one wins. Tokens that
/// have no substitution are left as they are.
pub fn substitute(content: &str, substitutions: &[Substitution]) -> String {
    let mut ordered: Vec<&Substitution> = substitutions
        .iter()
        .filter(|s| !s.token.is_empty())
        .collect();
    ordered.sort_by(|a, b| b.token.len().cmp(&a.token.len()));

    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    'scan: while let Some(c) = rest.chars().next() {
        for substitution in &ordered {
            if let Some(after) = rest.strip_prefix(substitution.token.as_str()) {
                out.push_str(&substitution.value);
                rest = after;
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Find placeholders of the form `[UPPER-CASE-NAME]` that are still present in `content`.
///
/// Each placeholder is reported once, in order of first appearance.
pub fn unresolved_tokens(content: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find('[') {
        let candidate = &rest[start + 1..];
        let name_len = candidate
            .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_'))
            .unwrap_or(candidate.len());
        let is_placeholder = name_len > 0
            && candidate[..name_len].starts_with(|c: char| c.is_ascii_uppercase())
            && candidate[name_len..].starts_with(']');
        if is_placeholder {
            let token = format!("[{}]", &candidate[..name_len]);
            if !tokens.contains(&token) {
                tokens.push(token);
            }
            rest = &candidate[name_len + 1..];
        } else {
            rest = candidate;
        }
    }

    tokens
}
