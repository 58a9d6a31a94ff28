//! Brightfold payments backend.
//!
//! Implements the payment-confirmation workflow behind the studio site:
//! Stripe payment-intent creation for one-off project payments and invoice
//! payments, signed webhook ingestion, and invoice/payment reconciliation
//! against Postgres.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod services;
pub mod stripe;
