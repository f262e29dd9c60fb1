// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SLA domain model
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Step thresholds, tracker aggregate, metric rule, events,
//!   repository interfaces and configuration manifest

pub mod clock;
pub mod error;
pub mod events;
pub mod report;
pub mod repository;
pub mod sla_config;
pub mod status_mapping;
pub mod step;
pub mod threshold;
pub mod tracker;
