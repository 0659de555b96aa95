pub mod product;
pub mod weight;
