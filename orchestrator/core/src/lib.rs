// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SLA Engine core
//!
//! Tracks how long each step of a multi-step business workflow takes against
//! a configured time allowance, detects breaches (including on still-open
//! steps) and aggregates compliance metrics.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application services and storage adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
