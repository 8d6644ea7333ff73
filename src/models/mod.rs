// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod filter;
pub mod segment;

pub use activity::Activity;
pub use filter::{ActivityFilter, DateRange};
pub use segment::{AliasTable, RawSegmentEffort, SegmentEffort, StarredSegments};
