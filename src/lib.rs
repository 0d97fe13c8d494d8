//! Cloud information provider: discovers what an OpenStack or OpenNebula
//! site offers and normalizes it into flat GLUE-style records.

pub mod cloud;
pub mod helpers;
pub mod normalize;
pub mod providers;
pub mod static_defaults;

pub use providers::{CloudInfo, Provider, ProviderError, collect};
pub use static_defaults::{StaticError, StaticProvider};
