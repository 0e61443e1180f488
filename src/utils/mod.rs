pub mod digest;
pub mod formatting;
pub mod truncation;
