pub mod catalog;

pub use catalog::{load_catalog_file, parse_catalog, EntityCatalog, InMemoryCatalog};
