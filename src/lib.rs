//! Rental Chat - Listing chat and notification delivery
//!
//! Hosts and guests of a rental marketplace talk in two-party rooms bound to
//! a listing. This crate owns the room store, unread counters, and the
//! commit-gated fan-out that turns a committed write into live pushes.

pub mod adapters;
pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
