use anyhow::Result;

use crate::store::PokedexStore;

pub fn create(store: &PokedexStore, username: String, email: Option<String>) -> Result<()> {
    let user = store.create_user(&username, email.as_deref())?;
    println!("User '{}' created with ID: {}", user.username, user.id);
    Ok(())
}

pub fn show(store: &PokedexStore, username: String) -> Result<()> {
    let user = store
        .get_user_by_username(&username)?
        .ok_or_else(|| anyhow::anyhow!("User not found: {}", username))?;

    store.update_discovery_percentage(user.id)?;
    let profile = store
        .get_profile(user.id)?
        .ok_or_else(|| anyhow::anyhow!("No profile for user: {}", username))?;

    println!("{}'s Profile", user.username);
    println!("{}", "-".repeat(40));
    println!("Joined:            {}", user.date_joined.format("%Y-%m-%d"));
    println!(
        "Discovered:        {} ({}%)",
        profile.total_pokemon_discovered, profile.discovery_percentage
    );
    println!("Games played:      {}", profile.total_games_played);
    println!("Highest score:     {}", profile.highest_score);
    println!("Total playtime:    {}s", profile.total_playtime);
    Ok(())
}
