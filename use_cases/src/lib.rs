pub mod fanout;
pub mod registration;
