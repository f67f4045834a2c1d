pub mod alignment;
pub mod congruence;
pub mod filters;
pub mod instance;
pub mod metrics;
pub mod prelude;
pub mod signal;
pub mod test_stuff;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Errors {
    #[error("Component {0} is missing from the map - the congruence breakdown must be recomputed.")]
    MissingComponent(String),
    #[error("Component {0} holds a value of an unexpected kind.")]
    ComponentKindMismatch(String),
}

pub(crate) const EPS: f32 = 0.00001;
