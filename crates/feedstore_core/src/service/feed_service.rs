//! Feed/item use-case service.

use crate::backend::{Backend, BackendKind, TransactionScope};
use crate::model::item::{Item, ITEM_DESCRIPTOR};
use crate::model::RecordId;
use crate::repo::{
    EntityRepository, FeedRepository, ItemRepository, MetaDataRepository, RepoError, RepoResult,
};
use log::error;

/// Row counts removed by [`FeedService::purge_item_children`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub metadata: usize,
    pub entities: usize,
}

/// Entry point for serving code: one backend handle, four repositories.
pub struct FeedService<'b> {
    backend: &'b dyn Backend,
}

impl<'b> FeedService<'b> {
    /// Creates a service over an explicitly opened backend.
    pub fn new(backend: &'b dyn Backend) -> Self {
        Self { backend }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn feeds(&self) -> FeedRepository<'b> {
        FeedRepository::new(self.backend)
    }

    pub fn items(&self) -> ItemRepository<'b> {
        ItemRepository::new(self.backend)
    }

    pub fn metadata(&self) -> MetaDataRepository<'b> {
        MetaDataRepository::new(self.backend)
    }

    pub fn entities(&self) -> EntityRepository<'b> {
        EntityRepository::new(self.backend)
    }

    /// Loads one item with its metadata and entity collections filled in.
    ///
    /// Returns repository-level `NotFound` unchanged when the item is absent.
    pub fn item_with_children(&self, item_id: RecordId) -> RepoResult<Item> {
        let mut item = self.items().find_by_id(item_id)?;
        item.metadata = self.metadata().find_by_owner(item_id)?;
        item.entities = self.entities().find_by_owner(item_id)?;
        Ok(item)
    }

    /// Lists the items of one feed in default item order, children not loaded.
    pub fn items_for_feed(&self, feed_id: RecordId) -> RepoResult<Vec<Item>> {
        self.items().find_by_owner(feed_id)
    }

    /// Removes every metadata and entity row owned by `item_id` in one scope.
    ///
    /// The item itself is untouched. Either both child sets are removed or
    /// neither is; a failed commit is `PartialCommitUnknown`.
    pub fn purge_item_children(&self, item_id: RecordId) -> RepoResult<PurgeSummary> {
        let mut scope = self.backend.begin()?;
        let summary = match self.stage_purge(scope.as_mut(), item_id) {
            Ok(summary) => summary,
            Err(err) => {
                if let Err(rollback_err) = scope.rollback() {
                    error!(
                        "event=purge_item_children module=service status=error error_code=rollback_failed error={}",
                        rollback_err
                    );
                }
                return Err(err);
            }
        };

        if let Err(source) = scope.commit() {
            error!(
                "event=purge_item_children module=service status=error error_code=commit_unknown error={}",
                source
            );
            return Err(RepoError::PartialCommitUnknown {
                collection: ITEM_DESCRIPTOR.collection,
                source,
            });
        }
        Ok(summary)
    }

    fn stage_purge(
        &self,
        scope: &mut (dyn TransactionScope + '_),
        item_id: RecordId,
    ) -> RepoResult<PurgeSummary> {
        let metadata = self.metadata().delete_by_owner_in(scope, item_id)?;
        let entities = self.entities().delete_by_owner_in(scope, item_id)?;
        Ok(PurgeSummary { metadata, entities })
    }
}
