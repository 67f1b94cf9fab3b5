//! Typeclass instantiation.
//!
//! Applying a typeclass to concrete arguments specializes every member
//! function by cloning it into a fresh instance scope where the typeclass
//! parameters are bound to the arguments. Instances are deduplicated per
//! `(typeclass, argument types)`.
//!
//! ## Components
//!
//! - [`InstanceCache`]: instances by key
//! - [`instantiate`]: look up or build an instance

mod cache;
mod instantiation;

pub use cache::{CachedInstance, InstanceCache};
pub use instantiation::{Instantiation, instantiate};
