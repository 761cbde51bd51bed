//! # Interrupt Control
//!
//! Re-entrant masking of maskable interrupts.

pub mod nesting;

pub use nesting::{InterruptGuard, InterruptNesting, INITIAL_DEPTH};
