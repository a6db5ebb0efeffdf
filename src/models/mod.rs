pub mod daily;
pub mod dataset;
pub mod member;
pub mod project;
pub mod snapshot;
pub mod sync_status;
