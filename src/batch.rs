use std::time::Duration;

use serde_json::{Value, json};
use tracing::warn;

use crate::correlator::send_create_request;
use crate::error::CreateError;
use crate::node::CreateRemItem;

/// Run a batch of create-Rem items strictly in order, one fresh connection
/// per item, each awaited to completion before the next starts.
///
/// With `continue_on_fail` a failed item becomes an error record carrying
/// the failure's message and the batch keeps going; otherwise the first
/// failure aborts the batch and nothing is emitted for it or the items
/// behind it. Output order equals input order either way.
pub async fn run_batch(
    items: &[CreateRemItem],
    port: u16,
    continue_on_fail: bool,
    timeout: Duration,
) -> Result<Vec<Value>, CreateError> {
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match send_create_request(&item.text, item.parent_id.as_deref(), port, timeout).await {
            Ok(payload) => records.push(payload),
            Err(err) if continue_on_fail => {
                warn!(kind = err.kind(), "create request failed: {}", err);
                records.push(json!({ "error": err.to_string() }));
            }
            Err(err) => return Err(err),
        }
    }
    Ok(records)
}
