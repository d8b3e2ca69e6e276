pub mod app;
pub mod app_dirs;
pub mod apply;
pub mod error;
pub mod events;
pub mod filter;
pub mod navigation;
pub mod profile;
pub mod project_index;
pub mod storage;
pub mod store;
pub mod transfer;

pub use app::Cookify;
pub use error::{CookifyError, Result};
