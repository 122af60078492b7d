//! finbot: run the finance entry bot, seed or list the budget catalog.

use anyhow::Result;
use clap::Parser;
use finance_bot::{
    load_config, open_catalog, render_catalog, run_bot, BaseConfig, CatalogSeed, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = load_config(token)?;
            run_bot(config).await
        }
        Commands::SeedCatalog { file } => {
            let seed = match file {
                Some(path) => CatalogSeed::from_file(path)?,
                None => CatalogSeed::builtin(),
            };
            let catalog = open_catalog(&BaseConfig::database_url_from_env()).await?;
            let summary = seed.apply(&catalog).await?;
            println!("Seeded {} groups, {} types", summary.groups, summary.types);
            Ok(())
        }
        Commands::ListCatalog => {
            let catalog = open_catalog(&BaseConfig::database_url_from_env()).await?;
            print!("{}", render_catalog(catalog.as_ref()).await?);
            Ok(())
        }
    }
}
