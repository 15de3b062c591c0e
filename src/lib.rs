//! Contract inspector panel.
//!
//! Uploads contract PDFs to an analysis server, renders the returned HTML
//! reports as collapsible cards, keeps the last few reports in a bounded
//! local history and tracks the server's connectivity.

pub mod activity;
pub mod cli;
pub mod client;
pub mod config;
pub mod history;
pub mod monitor;
pub mod panel;
pub mod utils;
pub mod web;
