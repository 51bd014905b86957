//! One editing session over a policy document.

use super::serializer::DocumentSerializer;
use crate::config::Config;
use crate::core::{self as reducer, Edit};
use crate::policy::PolicyDocument;
use crate::telemetry::{EditMetrics, EditStats};
use crate::Result;

use tracing::{debug, info, warn};
use uuid::Uuid;

/// Owns the current document for one user session.
///
/// Every change goes through [`EditorSession::apply`] or
/// [`EditorSession::replace_from_json`]. Both replace the document wholesale
/// on success and leave it untouched on failure.
#[derive(Debug)]
pub struct EditorSession {
    id: Uuid,
    document: PolicyDocument,
    serializer: DocumentSerializer,
    stats: EditStats,
}

impl EditorSession {
    /// Start a session from the configured template.
    pub fn new(config: &Config) -> Self {
        Self::with_document(config.template.document(), config)
    }

    /// Start a session on an existing document.
    pub fn with_document(document: PolicyDocument, config: &Config) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, effect = %document.effect(), "Editor session started");
        Self {
            id,
            document,
            serializer: DocumentSerializer::new(config.output.indent),
            stats: EditStats::new(),
        }
    }

    /// Session id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The current document.
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    /// Apply one edit.
    pub fn apply(&mut self, edit: &Edit) -> Result<&PolicyDocument> {
        match reducer::apply(&self.document, edit) {
            Ok(next) => {
                self.document = next;
                self.stats.record_applied();
                match edit.path() {
                    Some(path) => debug!(session = %self.id, edit = edit.name(), path = %path, "Edit applied"),
                    None => debug!(session = %self.id, edit = edit.name(), "Edit applied"),
                }
                Ok(&self.document)
            }
            Err(e) => {
                self.stats.record_rejected(&e);
                warn!(
                    session = %self.id,
                    edit = edit.name(),
                    category = e.category(),
                    error = %e,
                    "Edit rejected"
                );
                Err(e)
            }
        }
    }

    /// Apply a batch of edits atomically.
    pub fn apply_all(&mut self, edits: &[Edit]) -> Result<&PolicyDocument> {
        match reducer::apply_all(&self.document, edits) {
            Ok(next) => {
                self.document = next;
                for _ in edits {
                    self.stats.record_applied();
                }
                debug!(session = %self.id, count = edits.len(), "Edit batch applied");
                Ok(&self.document)
            }
            Err(e) => {
                self.stats.record_rejected(&e);
                warn!(session = %self.id, error = %e, "Edit batch rejected");
                Err(e)
            }
        }
    }

    /// Replace the document with manually edited JSON text.
    ///
    /// On failure the previous document is kept and the parse error is
    /// returned for display.
    pub fn replace_from_json(&mut self, text: &str) -> Result<&PolicyDocument> {
        match self.serializer.parse(text) {
            Ok(document) => {
                self.document = document;
                self.stats.record_applied();
                debug!(session = %self.id, "Document replaced from JSON text");
                Ok(&self.document)
            }
            Err(e) => {
                self.stats.record_rejected(&e);
                warn!(session = %self.id, error = %e, "JSON text edit discarded");
                Err(e)
            }
        }
    }

    /// The current document as canonical JSON text.
    pub fn render(&self) -> Result<String> {
        self.serializer.render(&self.document)
    }

    /// Edit counters for this session.
    pub fn stats(&self) -> EditMetrics {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ConditionPath, Effect};

    #[test]
    fn test_session_starts_from_template() {
        let mut config = Config::default();
        config.template.display_name = "Audit VMs".into();
        let session = EditorSession::new(&config);
        assert_eq!(session.document().metadata.display_name, "Audit VMs");
        assert_eq!(session.document().effect(), Effect::Audit);
        assert_eq!(session.stats().total(), 0);
    }

    #[test]
    fn test_rejected_edit_keeps_document() {
        let mut session = EditorSession::new(&Config::default());
        session
            .apply(&Edit::AddSimple { path: ConditionPath::root() })
            .unwrap();
        let before = session.document().clone();

        let result = session.apply(&Edit::RemoveChild {
            path: ConditionPath::root(),
            index: 7,
        });
        assert!(result.is_err());
        assert_eq!(session.document(), &before);

        let stats = session.stats();
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.rejected_by_category.get("invalid_path"), Some(&1));
    }

    #[test]
    fn test_replace_from_json() {
        let mut session = EditorSession::new(&Config::default());
        session.apply(&Edit::SetEffect { effect: Effect::Deny }).unwrap();
        let text = session.render().unwrap();

        let mut other = EditorSession::new(&Config::default());
        other.replace_from_json(&text).unwrap();
        assert_eq!(other.document().effect(), Effect::Deny);

        let before = other.document().clone();
        assert!(other.replace_from_json("{\"properties\": 3}").is_err());
        assert_eq!(other.document(), &before);
    }

    #[test]
    fn test_render_uses_configured_indent() {
        let mut config = Config::default();
        config.output.indent = 4;
        let session = EditorSession::new(&config);
        assert!(session.render().unwrap().starts_with("{\n    \"properties\""));
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let config = Config::default();
        assert_ne!(EditorSession::new(&config).id(), EditorSession::new(&config).id());
    }
}
