//! LendLoop Catalog - Items available for lending
//!
//! - Policy: the value ceiling, image bounds and category taxonomy
//! - Items: validated listings owned by a single member
//! - Registry: the in-memory catalog with owner-only mutation and browsing

pub mod policy;
pub mod item;
pub mod registry;

pub use policy::*;
pub use item::*;
pub use registry::*;
