//! Canonical JSON text for policy documents.

use crate::policy::PolicyDocument;
use crate::{Error, Result};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Default indentation for rendered documents.
pub const DEFAULT_INDENT: usize = 2;

/// Renders documents as pretty-printed JSON with a fixed indent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSerializer {
    indent: usize,
}

impl DocumentSerializer {
    /// A serializer indenting by `indent` spaces.
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }

    /// Spaces per level.
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Render a document.
    pub fn render(&self, document: &PolicyDocument) -> Result<String> {
        self.render_value(document)
    }

    /// Render any serializable value with this serializer's formatting.
    pub fn render_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let indent = vec![b' '; self.indent];
        let mut out = Vec::with_capacity(256);
        let mut serializer =
            Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
        value.serialize(&mut serializer)?;
        String::from_utf8(out)
            .map_err(|e| Error::internal(format!("rendered JSON is not UTF-8: {}", e)))
    }

    /// Parse document text. Malformed JSON and shape violations are user errors.
    pub fn parse(&self, text: &str) -> Result<PolicyDocument> {
        PolicyDocument::from_json(text)
    }
}

impl Default for DocumentSerializer {
    fn default() -> Self {
        Self::new(DEFAULT_INDENT)
    }
}
