//! Target-store interface consumed by the reconciler.

use async_trait::async_trait;

use crate::error::IcsyncResult;
use crate::event::{EventResource, StoredEvent};

/// The remote calendar store being kept in sync.
///
/// Implementations only ever surface sync-managed events: `list_managed`
/// must filter on the private source annotation, and events lacking it are
/// invisible to the reconciler (and therefore never touched).
#[async_trait]
pub trait TargetStore {
    /// Managed events whose occurrence window has not fully passed, keyed by
    /// identity.
    async fn list_managed(&self) -> IcsyncResult<Vec<StoredEvent>>;

    async fn insert(&self, resource: &EventResource) -> IcsyncResult<StoredEvent>;

    /// Full replace of the event's observable content and annotation.
    async fn patch(&self, event_id: &str, resource: &EventResource) -> IcsyncResult<StoredEvent>;

    async fn delete(&self, event_id: &str) -> IcsyncResult<()>;
}
