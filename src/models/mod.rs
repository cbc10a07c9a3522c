pub mod announcement;
pub mod interaction;
pub mod registration;
