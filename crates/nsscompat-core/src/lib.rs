//! # nsscompat-core
//!
//! Safe building blocks for thread-safe directory lookups.
//!
//! This crate owns everything that can be expressed without touching raw
//! pointers: the flattening routines that pack strings and string arrays into
//! a fixed-size scratch region, the bump arena that threads a cursor through a
//! record copy, the per-record field order, the strategy/capability model and
//! the runtime configuration. No `unsafe` code is permitted at the crate level.
//!
//! The pointer-patching half lives in `nsscompat-abi`, which hands this crate
//! byte slices and the base address of the region they live in.

#![deny(unsafe_code)]

pub mod arena;
pub mod config;
pub mod dbfile;
pub mod entry;
pub mod error;
pub mod metrics;
pub mod packer;
pub mod record;
pub mod strategy;

pub use arena::ScratchArena;
pub use entry::{GroupEntry, HostEntry, UserEntry};
pub use error::{LookupError, PackError};
pub use metrics::{LookupMetrics, MetricsSnapshot, global_metrics};
pub use packer::{ElementSize, POINTER_ALIGN, POINTER_SIZE, pack_array, pack_string};
pub use strategy::{Capabilities, RecordKind, Strategy, StrategyPlan, StrategyPreference};
