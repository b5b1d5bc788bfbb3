pub mod batch;
pub mod repair;
pub mod segments;
