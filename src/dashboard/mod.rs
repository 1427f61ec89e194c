//! Dashboard module
//!
//! Holds the master collection of scored transactions and renders it as
//! statistics, charts, a filterable table and a detail page per transaction.

mod aggregation;
mod cards;
mod charts;
mod controller;
mod detail;
mod filter;
mod forms;
mod handlers;
mod state;
mod tables;

pub use controller::forward_live_transactions;
pub use detail::get_transaction_page;
pub use handlers::{
    DashboardPageState, create_transaction_endpoint, get_dashboard_page, post_refresh,
};
pub use state::DashboardStore;
