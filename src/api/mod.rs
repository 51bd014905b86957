//! Public API for the policy builder.
//!
//! An [`EditorSession`] holds the document being edited and is the entry
//! point a form UI drives. [`DocumentSerializer`] produces the JSON preview.

mod serializer;
mod session;

pub use serializer::{DocumentSerializer, DEFAULT_INDENT};
pub use session::EditorSession;
