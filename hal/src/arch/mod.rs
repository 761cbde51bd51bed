//! # Architecture Support
//!
//! Ember targets 32-bit x86 only. The layout modules below are
//! architecture-defined data and compile everywhere; instruction wrappers
//! are gated on `target_arch = "x86"` inside each module.

pub mod x86;
