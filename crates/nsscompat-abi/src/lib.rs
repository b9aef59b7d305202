// Every extern "C" export takes raw pointers from C callers and documents its
// contract at module level.
#![allow(clippy::missing_safety_doc)]
//! # nsscompat-abi
//!
//! Thread-safe user, group and host lookups over the C library's directory
//! calls.
//!
//! ```text
//! caller -> lookup / snapshot / *_abi -> Dispatcher -> resolver -> thread slot
//!                                                        |
//!                       reentrant | legacy-reentrant | locked fallback + copier
//! ```
//!
//! Every answer lives in a per-thread, per-kind slot: a C record plus a
//! fixed-capacity region that all of the record's pointers point into. The
//! next lookup of the same kind on the same thread overwrites it.
//!
//! The strategy serving each kind is fixed the first time the global
//! dispatcher is used, from the target's capability table and
//! `NSSCOMPAT_STRATEGY`.

pub mod copier;
pub mod errno;
pub mod lock;
pub mod lookup;
pub mod resolver;
pub mod scratch;
pub mod snapshot;
mod sys;

pub mod grp_abi;
pub mod netdb_abi;
pub mod pwd_abi;

pub use lookup::{
    lookup_group_by_id, lookup_group_by_name, lookup_host_by_address, lookup_host_by_name,
    lookup_user_by_id, lookup_user_by_name,
};
pub use resolver::{DirectoryResolver, Dispatcher, dispatcher};
