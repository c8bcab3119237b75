pub mod backend;
mod content;
pub mod error;
mod path;

pub use crate::backend::ObjectStore;
pub use crate::content::content_key;
pub use crate::path::validate as validate_key;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn ObjectStore>;
