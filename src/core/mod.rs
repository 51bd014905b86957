//! Edit commands and the reducer that applies them.

mod edit;
mod reducer;

pub use edit::Edit;
pub use reducer::{apply, apply_all};
