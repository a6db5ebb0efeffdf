//! Functions a UI shell invokes. Each returns JSON or a display string.

pub mod dashboard;
pub mod records;
pub mod settings;
pub mod sync;
