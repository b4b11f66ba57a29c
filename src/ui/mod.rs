//! ui
//!
//! User-facing output utilities.
//!
//! # Design
//!
//! Operator-facing lines go through this module so quiet/debug modes are
//! honored consistently. Diagnostic logging is separate: the engine
//! emits `tracing` events, and the binary decides where those go.

pub mod output;
