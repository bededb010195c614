mod factory;
pub mod module;
mod value;
mod variant;

pub use factory::{host_variant, resolve_variant};
pub use module::PathModule;
pub use value::Path;
pub use variant::{PathVariant, Scheme};
