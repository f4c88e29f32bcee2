pub mod checkpoint;
pub mod core;
pub mod stream;
pub mod yaml;
