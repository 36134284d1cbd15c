//! Mapping commands: list, add, categorize, learn

use anyhow::{bail, Context, Result};
use bonscan_core::{
    Category, CategoryResolver, Database, MappingSource, NewMapping, ScanPipeline,
};

pub fn cmd_mappings_list(db: &Database) -> Result<()> {
    let mappings = db.all_mappings()?;

    if mappings.is_empty() {
        println!("No mappings stored. Run 'bonscan init' to seed the defaults.");
        return Ok(());
    }

    println!("{:>5}  {:<24} {:<12} {}", "ID", "Keyword", "Category", "Source");
    for mapping in mappings {
        println!(
            "{:>5}  {:<24} {:<12} {}",
            mapping.id,
            mapping.keyword,
            mapping.category,
            mapping.source.as_str()
        );
    }

    Ok(())
}

pub fn cmd_mappings_add(db: &Database, keyword: &str, category: &str) -> Result<()> {
    let category: Category = match category.parse() {
        Ok(c) => c,
        Err(_) => bail!(
            "Unknown category \"{}\". Valid categories: {}",
            category,
            Category::ALL.map(|c| c.as_str()).join(", ")
        ),
    };

    if keyword.trim().is_empty() {
        bail!("Keyword must not be empty");
    }

    db.insert_mappings(&[NewMapping::normalized(
        keyword,
        category,
        MappingSource::User,
    )])?;
    println!("✅ Added mapping \"{}\" → {}", keyword.trim().to_lowercase(), category);
    Ok(())
}

pub fn cmd_categorize(db: &Database, name: &str) -> Result<()> {
    let resolver = CategoryResolver::load(db)?;
    let category = resolver.resolve(name);
    println!("{} → {}", name, category);
    Ok(())
}

pub async fn cmd_learn(db: &Database, text: &str) -> Result<()> {
    let chain = super::build_chain(false)?
        .context("No providers configured; add some to providers.toml")?;
    let pipeline = ScanPipeline::new(db, Some(&chain));

    println!("🤖 Classifying \"{}\"...", super::truncate(text, 60));
    let learned = pipeline.learn_from_text(text).await?;

    if learned == 0 {
        println!("No usable keyword suggestions came back.");
    } else {
        println!("✅ Learned {} new mapping(s). See: bonscan mappings list", learned);
    }
    Ok(())
}
