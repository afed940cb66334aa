pub mod aggregate;
pub mod tips;
