use async_trait::async_trait;
use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batch::run_batch;
use crate::correlator::DEFAULT_TIMEOUT;
use crate::error::CreateError;

/// One batch item: the text of the Rem to create and, optionally, the id
/// of the Rem it should be nested under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRemItem {
    pub text: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

fn default_port() -> u16 {
    3333
}

/// Host-facing node parameters. Everything per-item lives on
/// [`CreateRemItem`]; these apply to the batch as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemNoteNode {
    /// Port the local companion listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Emit an error record per failed item instead of aborting the batch.
    #[serde(default)]
    pub continue_on_fail: bool,
}

impl Default for RemNoteNode {
    fn default() -> Self {
        Self {
            port: default_port(),
            continue_on_fail: false,
        }
    }
}

/// The surface a workflow host drives. One call processes one ordered
/// batch and yields exactly one record per item (tolerant mode) or the
/// first failure (strict mode).
#[async_trait]
pub trait NodeType: Send + Sync {
    fn name(&self) -> String;
    fn schema(&self) -> Schema;
    async fn execute(&self, items: &[CreateRemItem]) -> Result<Vec<Value>, CreateError>;
}

#[async_trait]
impl NodeType for RemNoteNode {
    fn name(&self) -> String {
        "remNote".to_owned()
    }

    fn schema(&self) -> Schema {
        schema_for!(RemNoteNode)
    }

    #[tracing::instrument(name = "rem_note_execute", skip(self, items), fields(items = items.len()))]
    async fn execute(&self, items: &[CreateRemItem]) -> Result<Vec<Value>, CreateError> {
        run_batch(items, self.port, self.continue_on_fail, DEFAULT_TIMEOUT).await
    }
}
