pub mod composition;
pub mod cues;
pub mod domain;
pub mod registry;
pub mod reports;
pub mod run;
pub mod serialization;
pub mod solver;
