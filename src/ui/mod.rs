//! Terminal-facing pieces.
//!
//! - **screen**: alternate screen buffer guard

pub mod screen;
