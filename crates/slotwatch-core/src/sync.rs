// ── Field synchronizer ──
//
// The only path that reads slot values from the node. Both the poller and
// on-demand refresh go through `sync`, so they share update semantics.

use std::sync::Arc;

use slotwatch_api::NodeClient;
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::model::{EntityId, SlotField};
use crate::store::StateStore;

/// Fetches one field from the node and applies it to the cache.
pub struct Synchronizer {
    client: Arc<NodeClient>,
    store: Arc<StateStore>,
}

impl Synchronizer {
    pub fn new(client: Arc<NodeClient>, store: Arc<StateStore>) -> Self {
        Self { client, store }
    }

    /// Fetch `field` for `id`, compare-then-write it, and return the
    /// fetched value whether or not it changed anything.
    ///
    /// Every attempt is recorded in the entity's sync status. Node
    /// failures and unparseable bodies leave the cached values untouched.
    pub async fn sync(&self, id: &EntityId, field: SlotField) -> Result<u64, CoreError> {
        let result = self.fetch_and_apply(id, field).await;
        self.store
            .record_attempt(id, field, result.as_ref().err().map(ToString::to_string));
        result
    }

    async fn fetch_and_apply(&self, id: &EntityId, field: SlotField) -> Result<u64, CoreError> {
        let body = self
            .client
            .read_process_value(id.as_str(), field.node_path())
            .await?;
        let value = parse_value(&body)?;

        if self.store.compare_and_set(id, field, value) {
            debug!(entity = %id, %field, value, "field changed");
        } else {
            trace!(entity = %id, %field, value, "field unchanged");
        }
        Ok(value)
    }
}

/// Base-10 `u64`, surrounding whitespace ignored.
fn parse_value(body: &str) -> Result<u64, CoreError> {
    body.trim()
        .parse::<u64>()
        .map_err(|_| CoreError::MalformedResponse {
            body: body.to_owned(),
        })
}
