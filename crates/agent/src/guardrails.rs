use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\+?1[-.\s]?)?(?:\(?\d{3}\)?[-.\s]?)?\d{3}[-.\s]?\d{4}\b")
        .expect("phone pattern is valid")
});
static CARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d[ -]*?){13,19}\b").expect("card pattern is valid"));

const OUT_OF_DOMAIN_TERMS: &[&str] = &["weather", "sports", "stocks", "translate", "song", "joke"];
const RISKY_TERMS: &[&str] = &["password", "ssn", "social security", "credit card", "cvv"];

/// Result of screening one inbound message. Computed once per turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardOutcome {
    pub sanitized_text: String,
    pub redacted: bool,
    pub in_domain: bool,
    pub risky: bool,
}

impl GuardOutcome {
    pub fn should_refuse(&self) -> bool {
        !self.in_domain || self.risky
    }
}

#[derive(Clone, Debug, Default)]
pub struct Guard;

impl Guard {
    pub fn new() -> Self {
        Self
    }

    /// Redacts first; the domain and risk checks only ever see the redacted text.
    pub fn apply(&self, text: &str) -> GuardOutcome {
        let sanitized_text = redact_pii(text);
        let lowered = sanitized_text.to_lowercase();

        GuardOutcome {
            redacted: sanitized_text != text,
            in_domain: !contains_any(&lowered, OUT_OF_DOMAIN_TERMS),
            risky: contains_any(&lowered, RISKY_TERMS),
            sanitized_text,
        }
    }
}

/// Replaces emails, then phone numbers, then card-like digit runs. Each pass sees the output of
/// the previous one.
pub fn redact_pii(text: &str) -> String {
    let text = EMAIL.replace_all(text, "[EMAIL]");
    let text = PHONE.replace_all(&text, "[PHONE]");
    CARD.replace_all(&text, "[CARD]").into_owned()
}

fn contains_any(lowered: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| lowered.contains(term))
}
