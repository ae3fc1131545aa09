//! Named-entity spans extracted from an item.

use crate::model::record::{EntityDescriptor, Record, RowReader};
use crate::model::value::{Column, FieldValue};
use crate::model::RecordId;
use crate::repo::RepoResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ENTITY_COLUMNS: &[Column] = &[
    Column::id("id"),
    Column::text("label"),
    Column::text("text"),
    Column::integer("start"),
    Column::integer("stop"),
    Column::id("item_id"),
];

/// `entities` collection layout. Unfiltered scans follow span position.
pub const ENTITY_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "entities",
    columns: ENTITY_COLUMNS,
    order_by: &["start", "id"],
    owner_column: Some("item_id"),
};

/// One extracted span: `text` covers characters `start..stop` of the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: RecordId,
    pub label: String,
    pub text: String,
    pub start: i64,
    pub stop: i64,
    pub item_id: RecordId,
}

impl Entity {
    pub fn new(
        item_id: RecordId,
        label: impl Into<String>,
        text: impl Into<String>,
        start: i64,
        stop: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            text: text.into(),
            start,
            stop,
            item_id,
        }
    }
}

impl Record for Entity {
    const DESCRIPTOR: &'static EntityDescriptor = &ENTITY_DESCRIPTOR;

    fn id(&self) -> RecordId {
        self.id
    }

    fn to_row(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.label.clone().into(),
            self.text.clone().into(),
            self.start.into(),
            self.stop.into(),
            self.item_id.into(),
        ]
    }

    fn from_row(row: RowReader<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.id("id")?,
            label: row.text("label")?,
            text: row.text("text")?,
            start: row.integer("start")?,
            stop: row.integer("stop")?,
            item_id: row.id("item_id")?,
        })
    }
}
