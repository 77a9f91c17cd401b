//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_allowlist.rs (caller IP gate)
//!     → forward handler
//!         → host_allowlist.rs (destination gate, also applied to redirects)
//! ```
//!
//! # Design Decisions
//! - Fail closed: an unparseable target URL is denied
//! - Empty allow-lists are an explicit open mode, not an omission
//! - No trust in `X-Forwarded-For` unless configured

pub mod client_allowlist;
pub mod host_allowlist;

pub use client_allowlist::{client_allowlist_middleware, ClientAllowList};
pub use host_allowlist::HostAllowList;
