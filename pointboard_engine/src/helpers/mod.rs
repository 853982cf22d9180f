mod order_numbers;
mod reconciliation;

pub use order_numbers::{
    OrderNumberFormat,
    OrderNumberGenerator,
    DEFAULT_GENERATION_ATTEMPTS,
    DEFAULT_ORDER_PREFIX,
};
pub use reconciliation::{map_transaction_status, reconcile_statuses, ReconciledStatus};
