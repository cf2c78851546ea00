//! Service layer: upstream fetches plus conversion, shared by tools and resources.

pub mod design;

pub use design::DesignService;
