//! Query commands - static answers from a variant without playing

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;

use hexlegion_core::recruit::available_recruits;
use hexlegion_core::{CreaturePool, RecruitOption, SpeciesId, Terrain, Variant};

// ============================================================================
// COMMAND ARGUMENTS
// ============================================================================

#[derive(Args)]
pub struct RecruitsArgs {
    /// Strategic terrain, e.g. marsh or tower
    #[arg(long)]
    pub terrain: String,

    /// Species names held by the legion
    #[arg(required = true)]
    pub species: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct BoardArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct VariantArgs {
    /// Output file (stdout if omitted)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Print the recruits a legion could make with a full pool
pub fn recruits(args: RecruitsArgs, variant: Arc<Variant>) -> Result<()> {
    let terrain = parse_terrain(&args.terrain)?;
    let options = recruit_options(&variant, terrain, &args.species)?;

    if args.json {
        #[derive(serde::Serialize)]
        struct JsonOption<'a> {
            recruit: &'a str,
            recruiters: Vec<&'a str>,
        }
        let table = &variant.species;
        let output: Vec<JsonOption> = options
            .iter()
            .map(|o| JsonOption {
                recruit: table.name(o.recruit),
                recruiters: o.recruiters.iter().map(|&r| table.name(r)).collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if options.is_empty() {
        println!("No recruits in {terrain:?}");
    }
    for option in &options {
        println!("{}", format_option(&variant, option));
    }
    Ok(())
}

/// Print every strategic hex with its terrain and links
pub fn board(args: BoardArgs, variant: Arc<Variant>) -> Result<()> {
    let board = variant.strategic_board()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&variant.board)?);
        return Ok(());
    }

    for hex in board.hexes() {
        let links: Vec<String> = hex
            .neighbors
            .iter()
            .zip(hex.exits.iter())
            .enumerate()
            .filter_map(|(dir, (n, gate))| n.map(|label| format!("{dir}:{label}{gate:?}")))
            .collect();
        println!("{:>4} {:<10} {}", hex.label, format!("{:?}", hex.terrain), links.join(" "));
    }
    println!("\n{} hexes, {} towers", board.hexes().count(), board.towers().len());
    Ok(())
}

/// Write the standard variant, to a file or stdout
pub fn variant(args: VariantArgs) -> Result<()> {
    let variant = Variant::standard();
    match args.output {
        Some(path) => {
            variant
                .save(&path)
                .with_context(|| format!("Failed to write variant: {}", path.display()))?;
            tracing::info!(path = %path.display(), "variant written");
        }
        None => println!("{}", serde_json::to_string_pretty(&variant)?),
    }
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn parse_terrain(name: &str) -> Result<Terrain> {
    Terrain::ALL
        .iter()
        .copied()
        .find(|t| format!("{t:?}").eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("Unknown terrain: {name}"))
}

fn recruit_options(variant: &Variant, terrain: Terrain, names: &[String]) -> Result<Vec<RecruitOption>> {
    let table = &variant.species;
    let species: Vec<SpeciesId> = names
        .iter()
        .map(|n| table.id(n).ok_or_else(|| anyhow!("Unknown species: {n}")))
        .collect::<Result<_>>()?;
    let Some(tree) = variant.recruit_tree(terrain) else {
        return Ok(Vec::new());
    };
    let pool = CreaturePool::new(table, 2);
    Ok(available_recruits(tree, &species, table, &pool))
}

fn format_option(variant: &Variant, option: &RecruitOption) -> String {
    let table = &variant.species;
    if option.recruiters.is_empty() {
        return table.name(option.recruit).to_string();
    }
    let recruiters: Vec<&str> = option.recruiters.iter().map(|&r| table.name(r)).collect();
    format!("{} <- {}", table.name(option.recruit), recruiters.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_terrain_ignores_case() {
        assert_eq!(parse_terrain("marsh").unwrap(), Terrain::Marsh);
        assert_eq!(parse_terrain("TOWER").unwrap(), Terrain::Tower);
        assert!(parse_terrain("lava").is_err());
    }

    #[test]
    fn test_tower_recruits() {
        let variant = Variant::standard();
        let names = vec!["Centaur".to_string(); 3];
        let options = recruit_options(&variant, Terrain::Tower, &names).unwrap();
        let names: Vec<&str> = options.iter().map(|o| variant.species.name(o.recruit)).collect();
        assert!(names.contains(&"Guardian"));
        assert!(names.contains(&"Centaur"));
        assert!(!names.contains(&"Warlock"));
    }

    #[test]
    fn test_unknown_species_is_error() {
        let variant = Variant::standard();
        let err = recruit_options(&variant, Terrain::Tower, &["Basilisk".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Basilisk"));
    }

    #[test]
    fn test_format_option() {
        let variant = Variant::standard();
        let table = &variant.species;
        let option = RecruitOption {
            recruit: table.id("Warlock").unwrap(),
            recruiters: vec![table.id("Titan").unwrap()],
        };
        assert_eq!(format_option(&variant, &option), "Warlock <- Titan");
    }
}
