pub mod error;
pub mod event;
pub mod location;
pub mod outcome;
pub mod query;
