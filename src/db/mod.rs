mod repository;
mod schema;

pub use repository::{MarketDiversity, Repository};
