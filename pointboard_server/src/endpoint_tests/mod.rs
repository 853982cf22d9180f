mod helpers;
mod orders;
mod reconciliation;
mod transactions;
