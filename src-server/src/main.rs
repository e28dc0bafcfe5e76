//! Project tree demo: opens (and seeds) a local database, loads it through
//! the sync coordinator and prints the tree.
//!
//! Usage: `project-tree-server [DB_PATH] [--json] [--search QUERY]`

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use project_tree::tree::flatten_tree;
use project_tree::{filter_forest, Backend, FilterOptions, RecentSearches, Status, SyncCoordinator, TrackerConfig};
use project_tree_server::LocalServer;

const DEFAULT_DB: &str = "project_tree.db";
const CONFIG_FILE: &str = "project_tree.json";
const SEARCHES_FILE: &str = "recent_searches.json";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let _ = rolling_logger::error(&format!("startup failed: {}", e));
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut json = false;
    let mut query = None;
    let mut db_path = PathBuf::from(DEFAULT_DB);
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--search" => query = args.next(),
            other => db_path = PathBuf::from(other),
        }
    }
    let data_dir = db_path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let log_file = rolling_logger::init_logger(data_dir.join("logs"), "ProjectTree")?;
    log::info!("logging to {}", log_file.display());

    let config = TrackerConfig::load(&data_dir.join(CONFIG_FILE))?;
    let server = Arc::new(LocalServer::open(&db_path).await?);
    server.seed_if_empty().await?;

    if json {
        let records = server.list_nodes().await?;
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let sync = SyncCoordinator::new(server, &config);
    sync.refresh().await?;
    let mut options = FilterOptions::default();
    if let Some(query) = query {
        let mut recent = RecentSearches::hydrate(data_dir.join(SEARCHES_FILE), config.recent_search_limit)?;
        recent.commit(&query)?;
        log::info!("recent searches: {:?}", recent.entries());
        options.query = query;
    }

    let visible = filter_forest(&sync.forest(), &options);
    for (node, depth) in flatten_tree(&visible, &HashSet::new()) {
        let marker = match (node.is_task, node.status) {
            (false, _) => "+",
            (true, Status::Done) => "x",
            (true, Status::Archived) => "~",
            (true, _) => "-",
        };
        println!("{}{} {}", "  ".repeat(depth), marker, node.name);
    }
    Ok(())
}
