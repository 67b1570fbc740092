//! treedb-inspect - print the tree held in a persistent store
//!
//! Usage:
//!   treedb-inspect <store-path> [--config <store.json>] [--count] [--json]
//!
//! Without flags the tree is printed one node per line, indented by depth.
//! Log level comes from TREEDB_LOG (default: info).

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};

use treedb::config::{self, StoreConfig};
use treedb::{Document, NodeId, SledStore, TracingSink};

fn print_subtree(doc: &Document, id: NodeId, depth: usize, on_path: &mut HashSet<NodeId>) -> anyhow::Result<()> {
    let payload_len = doc.get_node(id)?.map_or(0, |n| n.payload.len());
    if !on_path.insert(id) {
        println!("{}{:032x} (cycle)", "  ".repeat(depth), id);
        return Ok(());
    }

    println!("{}{:032x} [{} bytes]", "  ".repeat(depth), id, payload_len);
    for child in doc.get_children_in_tree(id)?.unwrap_or_default() {
        print_subtree(doc, child, depth + 1, on_path)?;
    }

    on_path.remove(&id);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(config::log_level())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: treedb-inspect <store-path> [--config <store.json>] [--count] [--json]");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  <store-path>   Store directory (.treedb is appended if missing)");
        eprintln!("  --config       JSON store config; its path is replaced by <store-path>");
        eprintln!("  --count        Print the node count only");
        eprintln!("  --json         Dump all records as JSON");
        std::process::exit(1);
    }

    let store_path = PathBuf::from(&args[1]);
    let config_path = args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1));
    let count_only = args.iter().any(|a| a == "--count");
    let as_json = args.iter().any(|a| a == "--json");

    let mut store_config = match config_path {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("reading store config {}", path))?,
        None => StoreConfig::default(),
    };
    store_config.path = config::normalize_store_path(&store_path);

    if !store_config.path.exists() {
        bail!("no store at {:?}", store_config.path);
    }

    let store = SledStore::open(&store_config)
        .with_context(|| format!("opening store {:?}", store_config.path))?;
    let doc = Document::open(store, Arc::new(TracingSink))?;

    if count_only {
        println!("{}", doc.node_count()?);
    } else if as_json {
        let snapshot = treedb::storage::decode_snapshot(&doc.get_database_bytes()?)?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        let mut on_path = HashSet::new();
        for root in doc.root_ids()? {
            print_subtree(&doc, root, 0, &mut on_path)?;
        }
    }

    doc.dispose()?;
    Ok(())
}
