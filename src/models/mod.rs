pub mod catalog;
pub mod comment;
pub mod frame;
pub mod intent;
pub mod outcome;
