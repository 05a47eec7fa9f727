//! Mail Sorter. Files shared-mailbox email into Purchase Orders, Quote
//! Requests and Needs Attention.

pub mod config;
pub mod error;
pub mod graph;
pub mod outbound;
pub mod pipeline;
pub mod sink;
