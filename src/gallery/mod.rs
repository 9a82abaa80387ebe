pub mod page;
pub mod seed;
