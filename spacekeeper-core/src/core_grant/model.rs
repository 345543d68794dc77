/*
    model.rs - Delegated-access grant records

    A DelegationGrant is the stored credential that lets the engine
    re-add one member to a space on their behalf. One record exists per
    authorization event; a member re-authorizing overwrites their prior
    record. Grants are never refreshed on the restoration path - a grant
    that is expired (or expiring within the safety margin) is simply
    treated as absent at read time.
*/

use crate::core_space::types::{SpaceId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stored delegated-access credential for one member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationGrant {
    pub member_id: UserId,
    /// Space the member authorized in
    pub source_space_id: SpaceId,
    /// Owner of the granting space; unknown until that space is resolved
    pub owner_id: Option<UserId>,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_kind: String,
    pub scope: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl DelegationGrant {
    /// Build a grant from the token response the host's authorization
    /// callback hands over
    pub fn from_token_response(
        member_id: UserId,
        source_space_id: SpaceId,
        owner_id: Option<UserId>,
        response: &TokenResponse,
        now: Timestamp,
    ) -> Self {
        DelegationGrant {
            member_id,
            source_space_id,
            owner_id,
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            token_kind: response.token_type.clone(),
            scope: response.scope.clone(),
            expires_at: now.plus(Duration::from_secs(response.expires_in)),
            created_at: now,
        }
    }

    /// Whether the grant can still admit its member: `expires_at` must be
    /// more than `margin` past `now`
    pub fn is_usable(&self, now: Timestamp, margin: Duration) -> bool {
        self.expires_at > now.plus(margin)
    }
}

/// Token payload from the delegated-authorization code exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub scope: String,
    /// Lifetime in seconds, relative to issuance
    pub expires_in: u64,
}
