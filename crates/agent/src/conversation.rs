use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use supportdesk_core::domain::intent::Intent;
use supportdesk_core::domain::order::OrderId;

pub const ORDER_ID_SLOT: &str = "order_id";

static ORDER_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b((?:[A-Za-z]-?)?[0-9]{3,6})\b").expect("order id pattern is valid")
});

const OUT_OF_SCOPE_HINTS: &[&str] = &["joke", "weather", "stock", "translate", "music"];

/// Scored intents in tie-break priority order: the first highest score wins.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::OrderStatus, &["status", "track", "tracking", "order"]),
    (Intent::CreateTicket, &["ticket", "issue", "problem", "support", "help"]),
    (Intent::Faq, &["refund", "return", "warranty", "shipping", "policy", "faq"]),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub intent: Intent,
    pub slots: BTreeMap<String, String>,
    pub reason: String,
}

impl Route {
    pub fn order_id(&self) -> Option<OrderId> {
        self.slots.get(ORDER_ID_SLOT).map(|value| OrderId(value.clone()))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Router;

impl Router {
    pub fn new() -> Self {
        Self
    }

    pub fn route(&self, text: &str) -> Route {
        let lowered = text.to_lowercase();
        if OUT_OF_SCOPE_HINTS.iter().any(|hint| lowered.contains(hint)) {
            return Route {
                intent: Intent::OutOfScope,
                slots: BTreeMap::new(),
                reason: "content unrelated to support domain".to_string(),
            };
        }

        let order_id = extract_order_id(text);
        let scores = INTENT_KEYWORDS
            .iter()
            .map(|(intent, keywords)| {
                (*intent, keywords.iter().filter(|keyword| lowered.contains(*keyword)).count())
            })
            .collect::<Vec<_>>();

        let mut intent = Intent::Faq;
        let mut best = 0;
        for (candidate, score) in &scores {
            if *score > best {
                intent = *candidate;
                best = *score;
            }
        }
        if order_id.is_some() {
            intent = Intent::OrderStatus;
        }

        let mut slots = BTreeMap::new();
        if let Some(order_id) = &order_id {
            slots.insert(ORDER_ID_SLOT.to_string(), order_id.0.clone());
        }

        Route { intent, slots, reason: describe(&scores, order_id.as_ref()) }
    }
}

/// First order-id-shaped token: an optional ASCII letter, an optional hyphen, then 3 to 6 ASCII
/// digits.
pub fn extract_order_id(text: &str) -> Option<OrderId> {
    ORDER_ID
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|matched| OrderId::normalize(matched.as_str()))
}

fn describe(scores: &[(Intent, usize)], order_id: Option<&OrderId>) -> String {
    let scores = scores
        .iter()
        .map(|(intent, score)| format!("{}={score}", intent.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let order_id = order_id.map(OrderId::as_str).unwrap_or("none");
    format!("scores={{{scores}}}, oid={order_id}")
}
