//! List command implementation

use anyhow::Result;

use crate::store::{PokedexStore, PokemonFilter};

pub fn run(store: &PokedexStore, filter: PokemonFilter) -> Result<()> {
    let pokemon = store.list_pokemon(&filter)?;

    if pokemon.is_empty() {
        println!("No Pokemon found. Run 'pokedex load' first.");
        return Ok(());
    }

    println!(
        "{:<6} {:<14} {:<20} {:>6} {:>4} {:<10}",
        "ID", "Name", "Types", "Total", "Gen", "Rarity"
    );
    println!("{}", "-".repeat(65));

    for p in &pokemon {
        let types = truncate(&p.record.types_display(), 20);

        println!(
            "{:<6} {:<14} {:<20} {:>6} {:>4} {:<10}",
            format!("#{:03}", p.record.pokedex_id),
            p.record.name,
            types,
            p.record.total_stats(),
            p.record.generation,
            p.rarity,
        );
    }

    println!("\n{} Pokemon", pokemon.len());
    Ok(())
}

/// Cut to at most `width` characters, marking the cut with `...`
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_is_unchanged() {
        assert_eq!(truncate("grass, poison", 20), "grass, poison");
        assert_eq!(truncate("", 20), "");
    }

    #[test]
    fn test_truncate_long_text() {
        let types = "normal, fighting, psychic";
        assert_eq!(truncate(types, 20), "normal, fighting,...");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        // Byte 17 falls inside a multi-byte character here
        let types = "ééééééééééééééééééééé";
        let cut = truncate(types, 20);
        assert_eq!(cut.chars().count(), 20);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("ééé", 20), "ééé");
    }
}
