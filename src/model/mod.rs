pub mod mode;
pub mod tick;
