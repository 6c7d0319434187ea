//! Infrastructure layer: OS- and network-facing adapters.
//!
//! **Dependency rule**: this layer may depend on `application` and `domain`,
//! but MUST NOT be imported by them.

pub mod storage;
pub mod transport;
