//! Catalog Module
//!
//! Records, the query model and the repository seam to the authoritative store.

mod memory;
mod model;
mod query;
mod repository;

pub use memory::{CatalogSnapshot, InMemoryCatalog};
pub use model::{Article, Sortable, Tag};
pub use query::{
    CompareOp, FetchWindow, ListingFilters, OrderBy, Predicate, SortField, SortOrder, SortSpec,
    SortValue, TagMode,
};
pub use repository::CatalogRepository;
