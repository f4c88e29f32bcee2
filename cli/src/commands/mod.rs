pub mod start;
pub mod validate;
