//! Command-line front end over a local-directory change feed

pub mod commands;

pub use commands::*;

use crate::config::ChangeFeedConfig;
use crate::error::Result;
use crate::feed::ChangeFeedClient;
use crate::storage::{JsonLinesDecoder, LocalBlobStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

fn load_config(path: Option<&Path>) -> Result<ChangeFeedConfig> {
    match path {
        Some(path) => ChangeFeedConfig::from_file(path),
        None => Ok(ChangeFeedConfig::default()),
    }
}

fn client_for(root: &Path, config: ChangeFeedConfig) -> Result<ChangeFeedClient> {
    let container: PathBuf = root.join(&config.container_name);
    let store = Arc::new(LocalBlobStore::new(container));
    ChangeFeedClient::new(store, Arc::new(JsonLinesDecoder::new()), config)
}

/// Execute a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Read {
            root,
            config,
            start,
            end,
            cursor,
            page_size,
            max_pages,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(page_size) = page_size {
                config.page_size = page_size;
            }
            let client = client_for(&root, config)?;
            let mut feed = match cursor {
                Some(token) => client.get_changes_from(&token)?,
                None => client.get_changes_in_range(start, end),
            };

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let mut pages = 0usize;
            let mut events = 0usize;
            while feed.has_next() && max_pages.map_or(true, |max| pages < max) {
                let page = feed.get_page(client.page_size()).await?;
                pages += 1;
                events += page.len();
                for event in page {
                    serde_json::to_writer(&mut out, &event)?;
                    out.write_all(b"\n")?;
                }
            }
            out.flush()?;

            info!(pages, events, more = feed.has_next(), "Finished reading");
            if let Ok(cursor) = feed.cursor() {
                eprintln!("continuation: {}", cursor.to_json()?);
            }
            Ok(())
        }
        Commands::Bound { root, config } => {
            let client = client_for(&root, load_config(config.as_deref())?)?;
            match client.last_consumable().await? {
                Some(bound) => println!("{bound}"),
                None => println!("change feed is not enabled"),
            }
            Ok(())
        }
    }
}
