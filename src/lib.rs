//! Folio application library
//!
//! Wires the catalog core, storage, and HTTP layer into the application's
//! modules.

pub mod bootstrap;
pub mod modules;

pub use modules::*;
