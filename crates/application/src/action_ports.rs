mod organization;
mod side_effect;

pub use organization::{ColumnSet, OrganizationService};
pub use side_effect::ActionSideEffect;
