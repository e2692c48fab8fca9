//! Verdict parsing: a reviewer's free-form critique is not trusted for its
//! prose. Only two literal, case-sensitive sentinels decide the outcome.

const APPROVED_SENTINEL: &str = "[x] **APPROVED**";
const REVISE_SENTINEL: &str = "[x] **REVISE**";

/// The result of scanning a reviewer's raw text for the approval sentinels
/// and for a self-declared model identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVerdict {
    pub approved: bool,
    pub model_identity_warning: Option<String>,
}

/// A verdict is approved iff the approve sentinel is present and the revise
/// sentinel is not. Any other content is advisory only.
#[must_use]
pub fn parse(raw_text: &str) -> ParsedVerdict {
    let approved = raw_text.contains(APPROVED_SENTINEL) && !raw_text.contains(REVISE_SENTINEL);
    ParsedVerdict { approved, model_identity_warning: None }
}

/// If `model_identity` does not contain the substring "pro" (case
/// insensitive), returns a warning line to prepend to the stored verdict.
#[must_use]
pub fn model_identity_warning(model_identity: &str) -> Option<String> {
    if model_identity.to_lowercase().contains("pro") {
        None
    } else {
        Some(format!(
            "WARNING: reviewer self-declared identity '{model_identity}' does not confirm a pro-tier model."
        ))
    }
}

/// Parses the verdict and attaches the model-identity warning, returning the
/// text that should actually be stored in the audit trail (warning prefixed
/// when present).
#[must_use]
pub fn parse_with_identity(raw_text: &str, model_identity: &str) -> (ParsedVerdict, String) {
    let mut verdict = parse(raw_text);
    verdict.model_identity_warning = model_identity_warning(model_identity);

    let stored = match &verdict.model_identity_warning {
        Some(warning) => format!("{warning}\n\n{raw_text}"),
        None => raw_text.to_string(),
    };

    (verdict, stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approved_sentinel_alone_approves() {
        let v = parse("Looks solid.\n\n[x] **APPROVED**");
        assert!(v.approved);
    }

    #[test]
    fn revise_sentinel_overrides_approved() {
        let v = parse("[x] **APPROVED** but also [x] **REVISE** fix the typo");
        assert!(!v.approved);
    }

    #[test]
    fn neither_sentinel_is_not_approved() {
        let v = parse("I have some thoughts but no verdict.");
        assert!(!v.approved);
    }

    #[test]
    fn sentinel_matching_is_case_sensitive() {
        let v = parse("[x] **approved**");
        assert!(!v.approved);
    }

    #[test]
    fn model_identity_warning_triggers_for_non_pro() {
        assert!(model_identity_warning("gemini-flash").is_some());
        assert!(model_identity_warning("gemini-2.5-pro").is_none());
        assert!(model_identity_warning("Claude-3-PRO").is_none());
    }

    #[test]
    fn parse_with_identity_prepends_warning_but_still_parses_sentinel() {
        let (verdict, stored) = parse_with_identity("[x] **APPROVED**", "gemini-flash");
        assert!(verdict.approved);
        assert!(stored.starts_with("WARNING:"));
        assert!(stored.contains("[x] **APPROVED**"));
    }
}
