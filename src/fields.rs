//! Declarative field encryption for JSON documents.
//!
//! The fields to protect are listed explicitly by name; only top-level string
//! values are touched. Nulls, numbers, objects and missing fields are left as
//! they are.

use serde_json::Value;

use crate::encryptor::{DecryptOutcome, FieldEncryptor};
use crate::error::Result;

// ============================================================================
// EncryptedFields
// ============================================================================

/// The set of top-level fields of a document that are stored encrypted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedFields {
    fields: Vec<String>,
}

impl EncryptedFields {
    /// Build from field names, keeping first-seen order and dropping repeats.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for field in fields {
            let field: String = field.into();
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        Self { fields: unique }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Replace each listed string field with its envelope.
    ///
    /// All fields are encrypted before any is written back, so on error the
    /// document is unchanged. Non-object documents are left alone.
    pub async fn encrypt_document(&self, encryptor: &FieldEncryptor, doc: &mut Value) -> Result<()> {
        let mut sealed = Vec::with_capacity(self.fields.len());
        for (field, plaintext) in self.string_fields(doc) {
            sealed.push((field, encryptor.encrypt(&plaintext).await?));
        }
        apply(doc, sealed);
        Ok(())
    }

    /// Replace each listed envelope field with its plaintext.
    ///
    /// Fields holding something other than an envelope are kept as they are
    /// and reported in the returned list, so callers can re-save them
    /// encrypted. A tampered or undecryptable envelope is an error and leaves
    /// the document unchanged.
    pub async fn decrypt_document(
        &self,
        encryptor: &FieldEncryptor,
        doc: &mut Value,
    ) -> Result<Vec<String>> {
        let mut opened = Vec::with_capacity(self.fields.len());
        let mut legacy = Vec::new();
        for (field, value) in self.string_fields(doc) {
            match encryptor.decrypt_or_legacy(&value).await? {
                DecryptOutcome::Decrypted(plaintext) => opened.push((field, plaintext)),
                DecryptOutcome::Legacy(_) => legacy.push(field),
            }
        }
        apply(doc, opened);
        Ok(legacy)
    }

    fn string_fields(&self, doc: &Value) -> Vec<(String, String)> {
        let Some(obj) = doc.as_object() else {
            return Vec::new();
        };
        self.fields
            .iter()
            .filter_map(|field| match obj.get(field) {
                Some(Value::String(s)) => Some((field.clone(), s.clone())),
                _ => None,
            })
            .collect()
    }
}

fn apply(doc: &mut Value, updates: Vec<(String, String)>) {
    if let Some(obj) = doc.as_object_mut() {
        for (field, value) in updates {
            obj.insert(field, Value::String(value));
        }
    }
}
