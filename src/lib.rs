// SPDX-License-Identifier: MPL-2.0

//! Core of a native booru tracker: watches tags and uploaders on a
//! booru-style imagery API, incrementally syncs new posts into a local
//! SQLite cache, and surfaces lifecycle events for a UI to observe.

pub mod booru;
pub mod config;
pub mod runtime;
pub mod store;
pub mod sync;
pub mod tags;
