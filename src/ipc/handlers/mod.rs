pub mod core;
pub mod grading;
pub mod reportcards;
pub mod roster;
pub mod students;
