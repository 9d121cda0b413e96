//! ec2-reservation-check library
//!
//! Reconciles running EC2 instances against reserved instances and reports
//! unused reservations and uncovered instances.

pub mod aws;
pub mod check;
pub mod config;
pub mod error;
pub mod provider;
pub mod reconcile;
pub mod report;

// Re-export commonly used types
pub use check::{check_reservations, Reconciliation};
pub use reconcile::{GroupKey, Platform, Scope};
