use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    OrderStatus,
    CreateTicket,
    Faq,
    OutOfScope,
}

impl Intent {
    pub const ALL: [Intent; 4] =
        [Intent::OrderStatus, Intent::CreateTicket, Intent::Faq, Intent::OutOfScope];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderStatus => "order_status",
            Self::CreateTicket => "create_ticket",
            Self::Faq => "faq",
            Self::OutOfScope => "out_of_scope",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::OrderStatus => 0,
            Self::CreateTicket => 1,
            Self::Faq => 2,
            Self::OutOfScope => 3,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
