use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use remnote_node::{CreateRemItem, NodeType, RemNoteNode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "remnote_node",
    about = "Create Rems in a local RemNote companion",
    version
)]
struct Cli {
    /// Text of each Rem to create, one batch item per argument
    #[arg(required_unless_present = "items")]
    texts: Vec<String>,

    /// JSON file holding the batch as an array of items
    /// (`[{"text": "...", "parentId": "..."}, ...]`)
    #[arg(long, value_name = "FILE", conflicts_with = "texts")]
    items: Option<PathBuf>,

    /// Port the local companion listens on
    #[arg(long, default_value_t = 3333)]
    port: u16,

    /// Parent Rem id applied to every item given as text
    #[arg(long, conflicts_with = "items")]
    parent_id: Option<String>,

    /// Emit an error record per failed item instead of aborting the batch
    #[arg(long)]
    continue_on_fail: bool,

    /// Log level override (e.g. error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_items(cli: &Cli) -> anyhow::Result<Vec<CreateRemItem>> {
    if let Some(path) = &cli.items {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading items file {}", path.display()))?;
        let items: Vec<CreateRemItem> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing items file {}", path.display()))?;
        Ok(items)
    } else {
        Ok(cli
            .texts
            .iter()
            .map(|text| CreateRemItem {
                text: text.clone(),
                parent_id: cli.parent_id.clone(),
            })
            .collect())
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let node = RemNoteNode {
        port: cli.port,
        continue_on_fail: cli.continue_on_fail,
    };
    let items = load_items(&cli)?;

    let records = node.execute(&items).await?;
    for record in &records {
        println!("{}", record);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_file_carries_per_item_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(
            &path,
            r#"[{"text": "root"}, {"text": "child", "parentId": "rem-1"}]"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from(["remnote_node", "--items", path.to_str().unwrap()])
            .expect("items file replaces positional texts");
        let items = load_items(&cli).expect("file parses");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].parent_id, None);
        assert_eq!(items[1].parent_id.as_deref(), Some("rem-1"));
    }

    #[test]
    fn texts_get_the_global_parent_id() {
        let cli =
            Cli::try_parse_from(["remnote_node", "--parent-id", "rem-7", "one", "two"]).unwrap();
        let items = load_items(&cli).unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.parent_id.as_deref() == Some("rem-7")));
    }

    #[test]
    fn items_file_and_texts_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["remnote_node", "a-text", "--items", "batch.json"]).is_err());
        assert!(Cli::try_parse_from(["remnote_node"]).is_err());
    }

    #[test]
    fn unreadable_items_file_is_an_error() {
        let cli = Cli::try_parse_from(["remnote_node", "--items", "/nonexistent/items.json"])
            .unwrap();
        assert!(load_items(&cli).is_err());
    }
}
