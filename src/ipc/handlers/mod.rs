pub mod assignments;
pub mod backup_exchange;
pub mod classes;
pub mod core;
pub mod grades;
pub mod grading;
pub mod schedule;
pub mod setup;
pub mod weights;
