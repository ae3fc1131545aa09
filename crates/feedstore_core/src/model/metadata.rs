//! Name/value annotations attached to an item.

use crate::model::record::{EntityDescriptor, Record, RowReader};
use crate::model::value::{Column, FieldValue};
use crate::model::RecordId;
use crate::repo::RepoResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const METADATA_COLUMNS: &[Column] = &[
    Column::id("id"),
    Column::text("name"),
    Column::text("content"),
    Column::id("item_id"),
];

pub const METADATA_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "metadata",
    columns: METADATA_COLUMNS,
    order_by: &["name", "id"],
    owner_column: Some("item_id"),
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    pub id: RecordId,
    pub name: String,
    /// Exposed as `value` in JSON.
    #[serde(rename = "value")]
    pub content: String,
    pub item_id: RecordId,
}

impl MetaData {
    pub fn new(item_id: RecordId, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content: content.into(),
            item_id,
        }
    }
}

impl Record for MetaData {
    const DESCRIPTOR: &'static EntityDescriptor = &METADATA_DESCRIPTOR;

    fn id(&self) -> RecordId {
        self.id
    }

    fn to_row(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.content.clone().into(),
            self.item_id.into(),
        ]
    }

    fn from_row(row: RowReader<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.id("id")?,
            name: row.text("name")?,
            content: row.text("content")?,
            item_id: row.id("item_id")?,
        })
    }
}
