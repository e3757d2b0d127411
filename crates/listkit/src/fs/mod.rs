//! Listfile source access for Listkit
//!
//! Every listfile read (`include()`, `add_subdirectory()`, the top-level
//! file) goes through the [`FileSystem`] trait:
//! - `InMemoryFs`: files held in memory, for tests and embedding
//! - `RealFs`: the host filesystem, used by the CLI

mod memory;
mod real;
mod traits;

pub use memory::InMemoryFs;
pub use real::RealFs;
pub use traits::{FileSystem, normalize_path};
