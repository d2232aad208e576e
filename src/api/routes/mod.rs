//! API Routes
//!
//! Route handlers organized by functionality.

pub mod health;
pub mod metrics;
pub mod read;
