//! Load the ingredient catalogue (and optionally tags) from JSON files
//!
//! ```text
//! import-ingredients data/ingredients.json --tags data/tags.json
//! ```

use anyhow::Context;
use clap::Parser;
use foodgram_common::{config::AppConfig, db::DbPool, Repository};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "import-ingredients", version, about = "Import catalogue data into Foodgram")]
struct Cli {
    /// JSON array of {"name", "measurement_unit"} objects
    ingredients: PathBuf,

    /// JSON array of {"name", "slug"} objects
    #[arg(long)]
    tags: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct IngredientRecord {
    name: String,
    measurement_unit: String,
}

#[derive(Debug, Deserialize)]
struct TagRecord {
    name: String,
    slug: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    let db = DbPool::new(&config.database).await?;
    db.migrate().await?;
    let repo = Repository::new(db);

    let ingredients: Vec<IngredientRecord> = read_json(&cli.ingredients).await?;
    let total = ingredients.len();
    let inserted = repo
        .import_ingredients(
            ingredients
                .into_iter()
                .map(|r| (r.name.trim().to_string(), r.measurement_unit.trim().to_string()))
                .collect(),
        )
        .await?;
    info!(inserted, skipped = total as u64 - inserted, "Ingredients imported");

    if let Some(path) = cli.tags {
        let tags: Vec<TagRecord> = read_json(&path).await?;
        let total = tags.len();
        let inserted = repo
            .import_tags(tags.into_iter().map(|r| (r.name, r.slug)).collect())
            .await?;
        info!(inserted, skipped = total as u64 - inserted, "Tags imported");
    }

    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))
}
