//! Repositories over the roster tables

pub mod persons;
pub mod saved_filters;

pub use persons::{ExistingIdentities, PersonRepository};
pub use saved_filters::SavedFilterRepository;
