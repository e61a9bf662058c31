//! Linux worker hardening.
//!
//! - landlock: read-only filesystem access beneath the project root
//! - rlimit: no file creation, no core dumps, optional address-space cap

pub mod landlock;
pub mod rlimit;

pub use self::landlock::restrict_to_read_only;
pub use self::rlimit::apply_resource_limits;
