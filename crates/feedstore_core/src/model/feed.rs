//! Feed source definitions.

use crate::model::record::{EntityDescriptor, Record, RowReader};
use crate::model::value::{Column, FieldValue};
use crate::model::RecordId;
use crate::repo::RepoResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const FEED_COLUMNS: &[Column] = &[
    Column::id("id"),
    Column::text("name"),
    Column::text("url"),
    Column::text("base_url"),
    Column::text("source_image_url"),
    Column::text("feed_item_url"),
    Column::text("source_name_internal"),
    Column::text("image_content_id"),
    Column::flag("active"),
    Column::text("pki_fingerprint"),
];

/// `feeds` collection layout. Unfiltered scans order by display name.
pub const FEED_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "feeds",
    columns: FEED_COLUMNS,
    order_by: &["name", "id"],
    owner_column: None,
};

/// A content source definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Feed document URL.
    pub url: String,
    pub base_url: String,
    pub source_image_url: String,
    /// Per-item URL template.
    pub feed_item_url: String,
    pub source_name_internal: String,
    /// Reference to stored image content for the source.
    pub image_content_id: String,
    pub active: bool,
    /// PKI fingerprint of the source.
    pub pki_fingerprint: String,
}

impl Feed {
    /// Creates an active feed with a generated id and empty optional fields.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name, url)
    }

    /// Creates an active feed with a caller-provided id.
    pub fn with_id(id: RecordId, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            url: url.into(),
            base_url: String::new(),
            source_image_url: String::new(),
            feed_item_url: String::new(),
            source_name_internal: String::new(),
            image_content_id: String::new(),
            active: true,
            pki_fingerprint: String::new(),
        }
    }
}

impl Record for Feed {
    const DESCRIPTOR: &'static EntityDescriptor = &FEED_DESCRIPTOR;

    fn id(&self) -> RecordId {
        self.id
    }

    fn to_row(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.url.clone().into(),
            self.base_url.clone().into(),
            self.source_image_url.clone().into(),
            self.feed_item_url.clone().into(),
            self.source_name_internal.clone().into(),
            self.image_content_id.clone().into(),
            self.active.into(),
            self.pki_fingerprint.clone().into(),
        ]
    }

    fn from_row(row: RowReader<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.id("id")?,
            name: row.text("name")?,
            url: row.text("url")?,
            base_url: row.text("base_url")?,
            source_image_url: row.text("source_image_url")?,
            feed_item_url: row.text("feed_item_url")?,
            source_name_internal: row.text("source_name_internal")?,
            image_content_id: row.text("image_content_id")?,
            active: row.flag("active")?,
            pki_fingerprint: row.text("pki_fingerprint")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Feed;

    #[test]
    fn serializes_with_camel_case_field_names() {
        let mut feed = Feed::new("Example", "https://example.com/rss");
        feed.source_image_url = "https://example.com/logo.png".to_string();

        let json = serde_json::to_value(&feed).unwrap();
        assert_eq!(json["sourceImageUrl"], "https://example.com/logo.png");
        assert_eq!(json["active"], true);
        assert!(json.get("source_image_url").is_none());
    }
}
