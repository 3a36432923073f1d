pub mod info;
pub mod read;
pub mod write;
