//! Swagger 2.0 document model, loading and route projection.
mod build;
mod load;
mod types;

pub use build::{build_routes, compare_specificity, template_params};
pub use load::{load_spec, load_spec_from_value, load_spec_str};
pub use types::*;
