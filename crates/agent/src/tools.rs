use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use supportdesk_core::domain::order::{Order, OrderId};
use supportdesk_db::{OrderRepository, RepositoryError};

use crate::escalation::EscalationOutcome;

const FIRST_TICKET_BASE: u64 = 1000;

/// Allocates ticket identifiers. Implementations must hand out unique, increasing ids even when
/// called from many turns at once.
pub trait TicketSequence: Send + Sync {
    fn next_ticket_id(&self) -> String;
}

#[derive(Debug)]
pub struct AtomicTicketSequence {
    counter: AtomicU64,
}

impl AtomicTicketSequence {
    pub fn starting_at(base: u64) -> Self {
        Self { counter: AtomicU64::new(base) }
    }
}

impl Default for AtomicTicketSequence {
    fn default() -> Self {
        Self::starting_at(FIRST_TICKET_BASE)
    }
}

impl TicketSequence for AtomicTicketSequence {
    fn next_ticket_id(&self) -> String {
        let next = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("T{next}")
    }
}

/// Serialized as `{found: true, id, status, eta_days}` or `{found: false}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderLookup {
    pub found: bool,
    #[serde(flatten)]
    pub order: Option<Order>,
}

impl OrderLookup {
    pub fn found(order: Order) -> Self {
        Self { found: true, order: Some(order) }
    }

    pub fn not_found() -> Self {
        Self { found: false, order: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub ticket_id: String,
    pub subject: String,
    pub desc: String,
}

/// Whatever a turn attaches as `tool_result`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    Order(OrderLookup),
    Ticket(Ticket),
    Handoff(EscalationOutcome),
}

#[derive(Clone)]
pub struct ToolDispatcher {
    orders: Arc<dyn OrderRepository>,
    tickets: Arc<dyn TicketSequence>,
}

impl ToolDispatcher {
    pub fn new(orders: Arc<dyn OrderRepository>, tickets: Arc<dyn TicketSequence>) -> Self {
        Self { orders, tickets }
    }

    pub async fn get_order_status(&self, id: &OrderId) -> Result<OrderLookup, RepositoryError> {
        Ok(match self.orders.find_by_id(id).await? {
            Some(order) => OrderLookup::found(order),
            None => OrderLookup::not_found(),
        })
    }

    pub fn create_ticket(&self, subject: &str, description: &str) -> Ticket {
        Ticket {
            ticket_id: self.tickets.next_ticket_id(),
            subject: subject.to_string(),
            desc: description.to_string(),
        }
    }
}
