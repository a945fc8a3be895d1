//! Dashboard module
//!
//! Provides an overview page with the ledger totals, where income comes from,
//! where expenses go and the most recent transactions.

mod cards;
mod charts;
mod handlers;
mod tables;

pub use handlers::{DashboardState, get_dashboard_page, get_dashboard_recent, get_dashboard_summary};
