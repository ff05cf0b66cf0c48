//! Utility library for the tank drive software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

#[macro_use]
pub mod logger;
pub mod maths;
pub mod params;
pub mod session;
pub mod time;

// ---------------------------------------------------------------------------
// REEXPORTS
// ---------------------------------------------------------------------------

pub use hal_if;
