pub mod batch;
pub mod correlator;
pub mod error;
pub mod node;
pub mod protocol;
pub mod test_util;

pub use correlator::{DEFAULT_TIMEOUT, send_create_request};
pub use error::CreateError;
pub use node::{CreateRemItem, NodeType, RemNoteNode};
