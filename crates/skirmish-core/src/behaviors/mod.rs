//! Built-in behavior strategies.
//!
//! - [`Standard`]: keep the current focus, else pick by intelligence
//! - [`Pack`]: join an ally's fight before picking a fresh target
//!
//! # Registration
//!
//! [`BehaviorRegistry::with_defaults()`](crate::behavior::BehaviorRegistry::with_defaults)
//! registers both under their ids.

mod pack;
mod standard;

pub use pack::Pack;
pub use standard::Standard;
