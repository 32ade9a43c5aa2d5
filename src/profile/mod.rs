pub mod requirements;
pub mod validation;

pub use requirements::ResourcesProfile;
pub use validation::ProfileValidationError;
