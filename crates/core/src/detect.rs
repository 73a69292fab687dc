//! Change detection between the debounced snapshot and the baseline

use crate::snapshot::Snapshot;
use serde::Serialize;
use std::fmt;

/// A tracked field of the editable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Username,
    DisplayName,
    Bio,
    Location,
    Instagram,
    Youtube,
    Website,
    Tags,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::DisplayName => "display_name",
            Field::Bio => "bio",
            Field::Location => "location",
            Field::Instagram => "instagram",
            Field::Youtube => "youtube",
            Field::Website => "website",
            Field::Tags => "tags",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when the debounced snapshot differs from the baseline
///
/// Both sides are normalized snapshots, so empty-vs-null drift never counts.
pub fn is_dirty(debounced: &Snapshot, baseline: &Snapshot) -> bool {
    debounced != baseline
}

/// Fields that differ between two snapshots (for logging)
pub fn changed_fields(debounced: &Snapshot, baseline: &Snapshot) -> Vec<Field> {
    let mut changed = Vec::new();
    if debounced.username() != baseline.username() {
        changed.push(Field::Username);
    }
    if debounced.display_name() != baseline.display_name() {
        changed.push(Field::DisplayName);
    }
    if debounced.bio() != baseline.bio() {
        changed.push(Field::Bio);
    }
    if debounced.location() != baseline.location() {
        changed.push(Field::Location);
    }
    if debounced.instagram() != baseline.instagram() {
        changed.push(Field::Instagram);
    }
    if debounced.youtube() != baseline.youtube() {
        changed.push(Field::Youtube);
    }
    if debounced.website() != baseline.website() {
        changed.push(Field::Website);
    }
    if debounced.tags() != baseline.tags() {
        changed.push(Field::Tags);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldEdit, ProfileDraft, ProfileRecord, TagId};

    fn capture(draft: &ProfileDraft) -> Snapshot {
        Snapshot::capture(&draft.fields, &draft.tags)
    }

    #[test]
    fn test_clean_after_hydration() {
        let record = ProfileRecord {
            username: "spacewolf99".into(),
            location: None,
            ..Default::default()
        };
        let baseline = Snapshot::from_record(&record);
        let draft = ProfileDraft::from_record(&record, 3);
        assert!(!is_dirty(&capture(&draft), &baseline));
    }

    #[test]
    fn test_edit_then_revert_is_clean() {
        let record = ProfileRecord {
            username: "spacewolf99".into(),
            ..Default::default()
        };
        let baseline = Snapshot::from_record(&record);
        let mut draft = ProfileDraft::from_record(&record, 3);

        draft.apply(FieldEdit::Bio("Veteran".into()));
        assert!(is_dirty(&capture(&draft), &baseline));

        draft.apply(FieldEdit::Bio(String::new()));
        assert!(!is_dirty(&capture(&draft), &baseline));
    }

    #[test]
    fn test_changed_fields_lists_each_difference() {
        let record = ProfileRecord {
            username: "spacewolf99".into(),
            ..Default::default()
        };
        let baseline = Snapshot::from_record(&record);
        let mut draft = ProfileDraft::from_record(&record, 3);
        draft.apply(FieldEdit::Location("Leeds".into()));
        draft.tags.toggle(TagId::from("orks"), 3).unwrap();

        assert_eq!(
            changed_fields(&capture(&draft), &baseline),
            vec![Field::Location, Field::Tags]
        );
    }
}
