pub mod document;
pub mod intent;
pub mod order;
pub mod turn;
