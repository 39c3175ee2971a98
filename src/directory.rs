//! Read-only profile lookups used to decorate challenge listings.
//!
//! The directory is an external collaborator and strictly best-effort:
//! lookups are eventually consistent and must never block or fail the
//! coordination logic. A missing or errored lookup simply yields no
//! profile.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::model::UserId;
use crate::store::StoreResult;

/// Public profile attributes shown next to an invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name chosen by the user.
    pub display_name: String,
    /// URL of the user's primary photo, if they have one.
    pub photo_url: Option<String>,
}

/// uid → profile lookup.
pub trait ProfileDirectory: Send + Sync {
    /// Fetch the profile for `uid`, if known.
    fn lookup(&self, uid: &str) -> BoxFuture<'static, StoreResult<Option<Profile>>>;
}

/// Fixed in-memory directory for tests and local development.
#[derive(Clone, Default)]
pub struct StaticDirectory {
    profiles: Arc<DashMap<UserId, Profile>>,
}

impl StaticDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a profile.
    pub fn insert(&self, uid: impl Into<UserId>, profile: Profile) {
        self.profiles.insert(uid.into(), profile);
    }
}

impl ProfileDirectory for StaticDirectory {
    fn lookup(&self, uid: &str) -> BoxFuture<'static, StoreResult<Option<Profile>>> {
        let profiles = self.profiles.clone();
        let uid = uid.to_owned();
        Box::pin(async move { Ok(profiles.get(&uid).map(|entry| entry.value().clone())) })
    }
}
