//! Items ingested from a feed.
//!
//! # Invariants
//! - `feed_id` references an existing feed when written.
//! - `metadata` and `entities` live in their own collections; the `items`
//!   collection never stores them and scans return them empty.

use crate::model::entity::Entity;
use crate::model::metadata::MetaData;
use crate::model::record::{EntityDescriptor, Record, RowReader};
use crate::model::value::{Column, FieldValue};
use crate::model::RecordId;
use crate::repo::RepoResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ITEM_COLUMNS: &[Column] = &[
    Column::id("id"),
    Column::text("title"),
    Column::text("description"),
    Column::text("source"),
    Column::text("source_url"),
    Column::text("source_type"),
    Column::text("author"),
    Column::timestamp("date_published"),
    Column::text("content_name"),
    Column::text("thumbnail"),
    Column::blob("bytes"),
    Column::text("rss_data_url"),
    Column::id("feed_id"),
];

pub const ITEM_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "items",
    columns: ITEM_COLUMNS,
    order_by: &["title", "id"],
    owner_column: Some("feed_id"),
};

/// One piece of content ingested from a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    /// Source display name.
    pub source: String,
    pub source_url: String,
    pub source_type: String,
    pub author: String,
    pub date_published: DateTime<Utc>,
    pub content_name: String,
    /// Thumbnail reference.
    pub thumbnail: String,
    /// Raw content bytes.
    pub bytes: Vec<u8>,
    pub rss_data_url: String,
    /// Owning feed.
    pub feed_id: RecordId,
    #[serde(default)]
    pub metadata: Vec<MetaData>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Item {
    /// Creates an item for `feed_id` published now.
    pub fn new(feed_id: RecordId, title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), feed_id, title)
    }

    pub fn with_id(id: RecordId, feed_id: RecordId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            source: String::new(),
            source_url: String::new(),
            source_type: String::new(),
            author: String::new(),
            date_published: Utc::now(),
            content_name: String::new(),
            thumbnail: String::new(),
            bytes: Vec::new(),
            rss_data_url: String::new(),
            feed_id,
            metadata: Vec::new(),
            entities: Vec::new(),
        }
    }
}

impl Record for Item {
    const DESCRIPTOR: &'static EntityDescriptor = &ITEM_DESCRIPTOR;

    fn id(&self) -> RecordId {
        self.id
    }

    fn to_row(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.title.clone().into(),
            self.description.clone().into(),
            self.source.clone().into(),
            self.source_url.clone().into(),
            self.source_type.clone().into(),
            self.author.clone().into(),
            self.date_published.into(),
            self.content_name.clone().into(),
            self.thumbnail.clone().into(),
            self.bytes.clone().into(),
            self.rss_data_url.clone().into(),
            self.feed_id.into(),
        ]
    }

    fn from_row(row: RowReader<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.id("id")?,
            title: row.text("title")?,
            description: row.text("description")?,
            source: row.text("source")?,
            source_url: row.text("source_url")?,
            source_type: row.text("source_type")?,
            author: row.text("author")?,
            date_published: row.timestamp("date_published")?,
            content_name: row.text("content_name")?,
            thumbnail: row.text("thumbnail")?,
            bytes: row.blob("bytes")?,
            rss_data_url: row.text("rss_data_url")?,
            feed_id: row.id("feed_id")?,
            metadata: Vec::new(),
            entities: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Item;
    use uuid::Uuid;

    #[test]
    fn json_uses_camel_case_and_includes_children() {
        let item = Item::new(Uuid::new_v4(), "headline");
        let json = serde_json::to_value(&item).unwrap();

        assert!(json.get("datePublished").is_some());
        assert!(json.get("feedId").is_some());
        assert_eq!(json["metadata"], serde_json::json!([]));
        assert_eq!(json["entities"], serde_json::json!([]));
    }
}
