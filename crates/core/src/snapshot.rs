//! Snapshot codec
//!
//! A `Snapshot` is the comparable form of the editable surface: every tracked
//! text field plus the ordered tag selection. Optional fields are normalized on
//! construction (`Some("")` and `None` both become `None`), so structural
//! equality never flags representation drift between freshly typed empty
//! fields and server-returned nulls.

use crate::error::CoreError;
use crate::hash::{Fingerprint, IncrementalHasher};
use crate::record::{ProfileFields, ProfileRecord, TagId, TagSelection};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Normalized, comparable copy of the editable surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    username: String,
    display_name: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    instagram: Option<String>,
    youtube: Option<String>,
    website: Option<String>,
    tags: SmallVec<[TagId; 4]>,
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn renormalize(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl Snapshot {
    /// Capture the form fields and tag selection as they are now
    pub fn capture(fields: &ProfileFields, tags: &TagSelection) -> Self {
        Self {
            username: fields.username.clone(),
            display_name: optional(&fields.display_name),
            bio: optional(&fields.bio),
            location: optional(&fields.location),
            instagram: optional(&fields.instagram),
            youtube: optional(&fields.youtube),
            website: optional(&fields.website),
            tags: tags.as_slice().iter().cloned().collect(),
        }
    }

    /// Snapshot of a persisted record (used for the initial baseline)
    pub fn from_record(record: &ProfileRecord) -> Self {
        Self {
            username: record.username.clone(),
            display_name: renormalize(record.display_name.clone()),
            bio: renormalize(record.bio.clone()),
            location: renormalize(record.location.clone()),
            instagram: renormalize(record.instagram.clone()),
            youtube: renormalize(record.youtube.clone()),
            website: renormalize(record.website.clone()),
            tags: record.tags.iter().cloned().collect(),
        }
    }

    /// Full-surface write payload carrying every tracked field
    pub fn to_record(&self) -> ProfileRecord {
        ProfileRecord {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            bio: self.bio.clone(),
            location: self.location.clone(),
            instagram: self.instagram.clone(),
            youtube: self.youtube.clone(),
            website: self.website.clone(),
            tags: self.tags.to_vec(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn instagram(&self) -> Option<&str> {
        self.instagram.as_deref()
    }

    pub fn youtube(&self) -> Option<&str> {
        self.youtube.as_deref()
    }

    pub fn website(&self) -> Option<&str> {
        self.website.as_deref()
    }

    pub fn tags(&self) -> &[TagId] {
        &self.tags
    }

    /// Encode to bytes (bincode)
    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bytes, re-applying normalization
    pub fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        let raw: Snapshot = bincode::deserialize(bytes)?;
        Ok(Self::from_record(&raw.to_record()))
    }

    /// Stable BLAKE3 fingerprint over the normalized fields
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = IncrementalHasher::new();
        hasher.update_str(&self.username);
        hasher.update_opt(self.display_name.as_deref());
        hasher.update_opt(self.bio.as_deref());
        hasher.update_opt(self.location.as_deref());
        hasher.update_opt(self.instagram.as_deref());
        hasher.update_opt(self.youtube.as_deref());
        hasher.update_opt(self.website.as_deref());
        hasher.update_len(self.tags.len());
        for tag in &self.tags {
            hasher.update_str(&tag.0);
        }
        hasher.finalize()
    }
}
