//! Tabula Views - Inspect fixture views from the command line.
//!
//! Loads a TOML fixture into an in-memory table model, creates its views and
//! prints the rows each view returns after filtering and sorting.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tabula_core::{Actor, UserId, init_tracing};
use tabula_interface::TableProvider;
use tabula_views::{Fixture, InMemoryTables, TypeRegistry, ViewHandler, ViewsConfig};
use tracing::{debug, info};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "tabula-views")]
#[command(about = "Tabula Views - Evaluate view filters and sorts over a fixture")]
#[command(version)]
struct Args {
    /// Fixture declaring tables, rows and views
    #[arg(short, long)]
    fixture: PathBuf,

    /// Engine configuration file; environment variables when omitted
    #[arg(short, long, env = "TABULA_CONFIG")]
    config: Option<PathBuf>,

    /// Only print this view
    #[arg(short, long)]
    view: Option<String>,

    /// Print rows as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info");

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ViewsConfig::from_file(path)?,
        None => ViewsConfig::from_env()?,
    };
    info!(?config, "Configuration loaded");

    let fixture = Fixture::load(&args.fixture)?;
    let tables = InMemoryTables::new();
    let handler = ViewHandler::new(
        Arc::new(TypeRegistry::with_builtin()),
        Arc::new(tables.clone()),
        Arc::new(tables.clone()),
        config,
    );
    let actor = Actor::User(UserId::from(1));
    let installed = fixture.install(&tables, &handler, &actor).await?;

    for (name, view_id) in installed.views() {
        if args.view.as_deref().is_some_and(|wanted| wanted != name.as_str()) {
            continue;
        }
        let view = handler.get_view(*view_id).await?;
        let rows = handler.query_view_rows(*view_id).await?;
        debug!(view = %name, rows = rows.len(), "Evaluated view");

        if args.json {
            for row in &rows {
                println!("{}", serde_json::to_string(row)?);
            }
            continue;
        }

        println!("== {} ({}, {} rows)", name, view.view_type(), rows.len());
        if let Some(slug) = view.slug() {
            println!("   public slug: {}", slug);
        }
        let fields: Vec<_> = tables
            .list_fields(*view.table_id())
            .await?
            .into_iter()
            .filter(|field| !*field.trashed())
            .collect();
        for row in &rows {
            let cells = fields
                .iter()
                .map(|field| format!("{}={}", field.name(), row.cell(*field.id()).as_search_text()))
                .collect::<Vec<_>>()
                .join("  ");
            println!("   #{:<4} {}", row.id(), cells);
        }
    }

    Ok(())
}
