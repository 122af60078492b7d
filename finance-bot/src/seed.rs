//! Catalog seeding and listing for the `seed-catalog` / `list-catalog` commands.
//!
//! Seed files are JSON:
//!
//! ```json
//! { "groups": [ { "name": "Home", "types": ["Rent", "Utilities"] } ] }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use storage::{Catalog, CatalogRepository};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSeed {
    pub groups: Vec<GroupSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSeed {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Rows touched by one seeding run. Existing rows are counted too; seeding is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub groups: usize,
    pub types: usize,
}

impl CatalogSeed {
    /// Starter catalog used when no seed file is given.
    pub fn builtin() -> Self {
        let group = |name: &str, types: &[&str]| GroupSeed {
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
        };
        Self {
            groups: vec![
                group("Home", &["Rent", "Utilities", "Internet"]),
                group("Food & Drink", &["Groceries", "Restaurants", "Coffee"]),
                group("Transport", &["Fuel", "Public Transport", "Parking"]),
                group("Personal", &["Health", "Clothing", "Entertainment"]),
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let seed: Self = serde_json::from_str(json).context("Invalid catalog seed JSON")?;
        for group in &seed.groups {
            if group.name.trim().is_empty() {
                anyhow::bail!("Catalog seed contains a group with an empty name");
            }
            if group.types.iter().any(|t| t.trim().is_empty()) {
                anyhow::bail!("Group {:?} contains a type with an empty name", group.name);
            }
        }
        Ok(seed)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Inserts every group and type; rows that already exist keep their ids.
    pub async fn apply(&self, repo: &CatalogRepository) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();
        for group in &self.groups {
            let group_id = repo.add_group(group.name.trim()).await?;
            summary.groups += 1;
            for name in &group.types {
                repo.add_type(group_id, name.trim()).await?;
                summary.types += 1;
            }
        }
        info!(groups = summary.groups, types = summary.types, "Catalog seeded");
        Ok(summary)
    }
}

/// One line per group (`<id> <label>`), its types indented below.
pub async fn render_catalog(catalog: &dyn Catalog) -> Result<String> {
    let mut out = String::new();
    for group in catalog.list_groups().await? {
        out.push_str(&format!("{} {}\n", group.id, group.label));
        for ty in catalog.list_types(group.id).await? {
            out.push_str(&format!("  {} {}\n", ty.id, ty.label));
        }
    }
    Ok(out)
}
