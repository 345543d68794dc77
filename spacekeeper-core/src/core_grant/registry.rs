/*
    registry.rs - Grant write path

    One canonical record per member authorization, keyed by
    "{source_space_id}:{member_id}". The member_id and owner_id fields
    double as secondary indexes through the store's field queries, which
    is what lets resolution survive the granting space being deleted.
    A later authorization by the same member in the same space overwrites
    the record. There is no expiry sweep; stale grants are filtered at
    read time by the resolver.
*/

use super::model::DelegationGrant;
use crate::core_space::types::{SpaceId, UserId};
use crate::core_store::{to_document, DocumentStore, StoreResult};
use std::sync::Arc;
use tracing::info;

/// Write-side handle for delegation grants
pub struct GrantRegistry<S: DocumentStore> {
    store: Arc<S>,
    collection: String,
}

impl<S: DocumentStore> GrantRegistry<S> {
    pub fn new(store: Arc<S>, collection: String) -> Self {
        Self { store, collection }
    }

    /// Canonical record key for a member's grant in a space
    pub fn primary_key(space: &SpaceId, member: &UserId) -> String {
        format!("{}:{}", space, member)
    }

    /// Upsert the grant record for this authorization event
    pub async fn record(&self, grant: &DelegationGrant) -> StoreResult<()> {
        let key = Self::primary_key(&grant.source_space_id, &grant.member_id);
        let document = to_document(grant)?;
        self.store.put(&self.collection, &key, document).await?;
        info!(
            member = %grant.member_id,
            space = %grant.source_space_id,
            "recorded delegation grant"
        );
        Ok(())
    }

    /// Drop a member's grant record for one space
    pub async fn revoke(&self, space: &SpaceId, member: &UserId) -> StoreResult<()> {
        let key = Self::primary_key(space, member);
        self.store.delete(&self.collection, &key).await?;
        info!(member = %member, space = %space, "revoked delegation grant");
        Ok(())
    }
}
