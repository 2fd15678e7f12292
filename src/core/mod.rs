pub mod error;
pub mod types;

pub use error::{AuditError, Result};
pub use types::{LifecycleFlags, StateCode, Transition, split_type_name};
