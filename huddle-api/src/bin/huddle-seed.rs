//! # Huddle Seeder
//!
//! Loads sample users, groups and games into the database, or wipes them.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p huddle-api --bin huddle-seed -- -i huddle-api/seed/data.json
//! cargo run -p huddle-api --bin huddle-seed -- -d
//! ```
//!
//! Only `DATABASE_URL` is read from the environment (or `.env`).

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use huddle_shared::{
    auth::password::HashParams,
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    seed::{self, SeedData},
    store::PgStore,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "huddle-seed")]
#[command(about = "Import or destroy Huddle seed data")]
#[command(group(ArgGroup::new("mode").required(true).args(["import", "destroy"])))]
struct Cli {
    /// Import users, groups and games from a JSON seed file
    #[arg(short, long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Delete all users, groups and games
    #[arg(short, long)]
    destroy: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "huddle_shared=info".into()),
        )
        .init();

    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL environment variable is required")?;

    ensure_database_exists(&url).await?;
    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 2,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    if let Some(path) = cli.import {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let data = SeedData::from_json(&raw)?;

        let store = PgStore::new(pool.clone());
        let summary = seed::import(&store, &data, HashParams::default()).await?;
        println!(
            "Data imported: {} users, {} groups, {} games, {} members",
            summary.users, summary.groups, summary.games, summary.members
        );
    } else {
        seed::destroy(&pool).await?;
        println!("Data destroyed");
    }

    close_pool(pool).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_import_with_file() {
        let cli = Cli::parse_from(["huddle-seed", "-i", "seed/data.json"]);
        assert_eq!(cli.import, Some(PathBuf::from("seed/data.json")));
        assert!(!cli.destroy);
    }

    #[test]
    fn parse_destroy() {
        let cli = Cli::parse_from(["huddle-seed", "--destroy"]);
        assert!(cli.destroy);
        assert!(cli.import.is_none());
    }

    #[test]
    fn parse_requires_exactly_one_mode() {
        assert!(Cli::try_parse_from(["huddle-seed"]).is_err());
        assert!(Cli::try_parse_from(["huddle-seed", "-i", "data.json", "-d"]).is_err());
    }
}
