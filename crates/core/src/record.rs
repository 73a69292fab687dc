//! Profile record as persisted, and the editable draft behind the form

use crate::error::CoreError;
use crate::handle::normalize_handle_input;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Identity of the profile owner (the signed-in user)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an affinity tag (faction, army, game system)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub String);

impl From<&str> for TagId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Profile as stored remotely
///
/// This is both the hydration source and the write payload: the store treats
/// every update as a full replace of the editable surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagId>,
}

/// Social link slots on the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Youtube,
    Website,
}

/// Text fields of the profile form, as typed
///
/// Empty strings stand for "not set"; the snapshot codec folds them together
/// with server-side nulls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub location: String,
    pub instagram: String,
    pub youtube: String,
    pub website: String,
}

impl ProfileFields {
    pub fn from_record(record: &ProfileRecord) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            username: record.username.clone(),
            display_name: text(&record.display_name),
            bio: text(&record.bio),
            location: text(&record.location),
            instagram: text(&record.instagram),
            youtube: text(&record.youtube),
            website: text(&record.website),
        }
    }
}

/// A single user edit to a text field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldEdit {
    Username(String),
    DisplayName(String),
    Bio(String),
    Location(String),
    Social(SocialPlatform, String),
}

/// Ordered selection of affinity tags, bounded by `max_tags`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSelection {
    tags: SmallVec<[TagId; 4]>,
}

impl TagSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted tags, dropping duplicates and anything past `max`
    pub fn from_persisted(tags: &[TagId], max: usize) -> Self {
        let mut selection = Self::new();
        for tag in tags {
            if selection.tags.len() == max {
                break;
            }
            if !selection.contains(tag) {
                selection.tags.push(tag.clone());
            }
        }
        selection
    }

    /// Select or deselect a tag
    ///
    /// Returns `true` when the tag is selected afterwards.
    pub fn toggle(&mut self, tag: TagId, max: usize) -> Result<bool, CoreError> {
        if let Some(pos) = self.tags.iter().position(|t| *t == tag) {
            self.tags.remove(pos);
            return Ok(false);
        }
        if self.tags.len() >= max {
            return Err(CoreError::TagLimit { max });
        }
        self.tags.push(tag);
        Ok(true)
    }

    /// Replace the whole selection
    pub fn replace(&mut self, tags: Vec<TagId>, max: usize) -> Result<(), CoreError> {
        let mut next = Self::new();
        for tag in tags {
            if next.contains(&tag) {
                continue;
            }
            if next.tags.len() >= max {
                return Err(CoreError::TagLimit { max });
            }
            next.tags.push(tag);
        }
        *self = next;
        Ok(())
    }

    pub fn contains(&self, tag: &TagId) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn as_slice(&self) -> &[TagId] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// In-memory record being edited
///
/// Mutated only by the input handlers below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub fields: ProfileFields,
    pub tags: TagSelection,
}

impl ProfileDraft {
    /// Hydrate a draft from the persisted record
    pub fn from_record(record: &ProfileRecord, max_tags: usize) -> Self {
        Self {
            fields: ProfileFields::from_record(record),
            tags: TagSelection::from_persisted(&record.tags, max_tags),
        }
    }

    /// Apply a text edit
    ///
    /// Handle input is normalized (trimmed, lowercased) on the way in.
    pub fn apply(&mut self, edit: FieldEdit) {
        let fields = &mut self.fields;
        match edit {
            FieldEdit::Username(value) => fields.username = normalize_handle_input(&value),
            FieldEdit::DisplayName(value) => fields.display_name = value,
            FieldEdit::Bio(value) => fields.bio = value,
            FieldEdit::Location(value) => fields.location = value,
            FieldEdit::Social(SocialPlatform::Instagram, value) => fields.instagram = value,
            FieldEdit::Social(SocialPlatform::Youtube, value) => fields.youtube = value,
            FieldEdit::Social(SocialPlatform::Website, value) => fields.website = value,
        }
    }

    pub fn username(&self) -> &str {
        &self.fields.username
    }
}
