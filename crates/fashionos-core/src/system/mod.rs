//! # System Module
//!
//! Stage definitions and progress reporting for the event wizard.

mod stage;

pub use stage::*;
