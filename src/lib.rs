//! # Azure Policy Builder
//!
//! Editing engine for custom Azure Policy definitions. A form-based UI drives
//! an [`EditorSession`] with discrete [`Edit`] commands; each edit produces a
//! complete new [`PolicyDocument`] that renders to Azure Policy JSON.
//!
//! ## Features
//!
//! - **Condition tree**: simple, nested (`allOf`/`anyOf`), count and negated
//!   conditions, addressed by [`ConditionPath`]
//! - **Pure edits**: every operation returns a new document or an error,
//!   never a partially modified one
//! - **Parameters and effects**: typed parameter definitions, the reserved
//!   `effect` parameter, and Modify details
//! - **JSON round trip**: manual edits to the JSON preview are parsed back
//!   into the model
//!
//! ## Quick Start
//!
//! ```rust
//! use azure_policy_builder::{Condition, Config, ConditionPath, Edit, EditorSession};
//!
//! let mut session = EditorSession::new(&Config::default());
//! session.apply(&Edit::AddSimple { path: ConditionPath::root() })?;
//! session.apply(&Edit::UpdateChild {
//!     path: ConditionPath::root(),
//!     index: 0,
//!     condition: Condition::equals("type", "Microsoft.Storage/storageAccounts"),
//! })?;
//!
//! let json = session.render()?;
//! assert!(json.contains("\"allOf\""));
//! # Ok::<(), azure_policy_builder::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod policy;
pub mod telemetry;

// Re-export main types for convenience
pub use api::{DocumentSerializer, EditorSession};
pub use crate::config::Config;
pub use crate::core::{apply, apply_all, Edit};
pub use error::{Error, Result};
pub use policy::{
    Condition, ConditionPath, ConditionTree, CountComparator, Effect, GroupKind, MoveDirection,
    OperatorKind, ParameterDefinition, ParameterType, PolicyDocument, PolicyMetadata, PolicyMode,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
