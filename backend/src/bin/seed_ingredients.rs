//! Seed the ingredient catalogue from a CSV fixture.
//!
//! Rows are upserted by their `(name, measurement_unit)` pair, so the
//! command is safe to rerun against a populated database.

use std::env;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use tokio::runtime::Builder;

use backend::domain::catalogue::NewIngredient;
use backend::domain::ports::CatalogueRepository;
use backend::outbound::persistence::{DbPool, DieselCatalogueRepository, PoolConfig};

/// `seed-ingredients` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "seed-ingredients",
    about = "Load the ingredient reference list from a CSV fixture",
    version
)]
struct CliArgs {
    /// Path to a CSV file with a `name,measurement_unit` header.
    #[arg(long = "csv", value_name = "path")]
    csv_path: PathBuf,
    /// Database connection URL. Falls back to `DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = CliArgs::parse();
    let contents = std::fs::read_to_string(&args.csv_path)
        .wrap_err_with(|| format!("read fixture '{}'", args.csv_path.display()))?;
    let ingredients = parse_fixture(&contents)?;

    let database_url = resolve_database_url(args.database_url)?;
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .wrap_err("create database pool")?;
    let repository = DieselCatalogueRepository::new(pool);

    let inserted = repository
        .upsert_ingredients(&ingredients)
        .await
        .wrap_err("upsert ingredients")?;
    println!(
        "parsed={} inserted={} existing={}",
        ingredients.len(),
        inserted,
        ingredients.len() - inserted
    );
    Ok(())
}

fn parse_fixture(contents: &str) -> Result<Vec<NewIngredient>> {
    let mut lines = contents.lines();
    let header = lines.next().ok_or_else(|| eyre!("fixture file is empty"))?;
    if header.trim() != "name,measurement_unit" {
        bail!(
            "expected 'name,measurement_unit' header, found '{}'",
            header.trim()
        );
    }

    let mut ingredients = Vec::new();
    for (index, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        // Units never contain commas; names may, so split at the last one.
        let (name, unit) = line
            .rsplit_once(',')
            .ok_or_else(|| eyre!("line {}: expected 'name,measurement_unit'", index + 2))?;
        let ingredient =
            NewIngredient::new(name, unit).wrap_err_with(|| format!("line {}", index + 2))?;
        ingredients.push(ingredient);
    }
    Ok(ingredients)
}

fn resolve_database_url(explicit: Option<String>) -> Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            bail!("--database-url must not be empty when provided");
        }
        return Ok(value);
    }

    let from_env = env::var("DATABASE_URL")
        .map_err(|_| eyre!("database URL missing: set --database-url or DATABASE_URL"))?;
    if from_env.trim().is_empty() {
        bail!("DATABASE_URL must not be empty");
    }
    Ok(from_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_fixture_with_header() {
        let ingredients =
            parse_fixture("name,measurement_unit\nflour,g\nmilk,ml\n").expect("fixture parses");
        assert_eq!(ingredients.len(), 2);
        assert_eq!(ingredients[0].name, "flour");
        assert_eq!(ingredients[1].measurement_unit, "ml");
    }

    #[rstest]
    fn name_may_contain_commas() {
        let ingredients = parse_fixture("name,measurement_unit\n\"peppers, mixed\",g\n")
            .expect("fixture parses");
        assert_eq!(ingredients[0].name, "\"peppers, mixed\"");
        assert_eq!(ingredients[0].measurement_unit, "g");
    }

    #[rstest]
    fn skips_blank_lines() {
        let ingredients =
            parse_fixture("name,measurement_unit\n\nflour,g\n\n").expect("fixture parses");
        assert_eq!(ingredients.len(), 1);
    }

    #[rstest]
    fn rejects_missing_header() {
        let error = parse_fixture("flour,g\n").expect_err("header required");
        assert!(error.to_string().contains("header"));
    }

    #[rstest]
    fn rejects_row_without_unit() {
        let error = parse_fixture("name,measurement_unit\nflour\n").expect_err("unit required");
        assert!(error.to_string().contains("line 2"));
    }

    #[rstest]
    fn resolve_database_url_rejects_empty_explicit() {
        let error = resolve_database_url(Some("   ".to_owned())).expect_err("empty should fail");
        assert!(error.to_string().contains("must not be empty"));
    }
}
