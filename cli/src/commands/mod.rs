// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the SLA CLI

pub mod config;
pub mod report;
pub mod sweep;
pub mod threshold;
pub mod tracker;
pub mod update;

pub use self::config::ConfigCommand;
pub use self::report::ReportCommand;
pub use self::sweep::SweepCommand;
pub use self::threshold::ThresholdCommand;
pub use self::tracker::TrackerCommand;
pub use self::update::UpdateCommand;
