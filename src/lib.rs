// VPN Reconciliation Library
// Shared modules for the binary and tests

#![warn(missing_docs)]

//! VPN Reconciliation Library
//!
//! This library decides, once per invocation, whether a VPN tunnel should be
//! connected or disconnected based on the identity of the active network,
//! its trust status and internet reachability, with a reset timer that
//! restores protection after prolonged downtime.
//!
//! # Main Components
//!
//! - [`config`]: Configuration file parsing and validation
//! - [`engine`]: The per-invocation reconciliation decision core
//! - [`journal`]: Buffered decision journal
//! - [`network_observer`]: Active network identification
//! - [`probe`]: Internet reachability probing
//! - [`state_store`]: Persisted cross-invocation state
//! - [`trust_store`]: Trusted network list
//! - [`types`]: Shared data structures
//! - [`vpn_controller`]: VPN client CLI control

pub mod config;
pub mod engine;
pub mod journal;
pub mod network_observer;
pub mod probe;
pub mod state_store;
pub mod trust_store;
pub mod types;
pub mod vpn_controller;
