//! Testing utilities for code that logs through scopelog.
//!
//! This module provides:
//! - In-memory and failing transports
//! - Scripted request and pub/sub adapters
//! - Assertions over captured records

mod adapters;
mod assertions;
mod transports;

pub use adapters::{LoopbackBroker, RecordingDelivery, ScriptedAdapter};
pub use assertions::{assert_events, assert_field, assert_no_field, assert_timed};
pub use transports::{FailingTransport, MemoryTransport, SlowFlushTransport};
