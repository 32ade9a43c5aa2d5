pub mod availability;
pub mod key;

pub use availability::{Amount, AvailabilityLedger, ResourceAvailability};
pub use key::{GLOBAL_PROJECT, ResourceKey, SCOPE_GLOBAL, SCOPE_PROJECT, Scope};
