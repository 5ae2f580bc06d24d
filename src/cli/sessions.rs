use anyhow::Result;

use crate::store::PokedexStore;

pub fn run(store: &PokedexStore, username: Option<String>) -> Result<()> {
    let sessions = store.list_game_sessions(username.as_deref())?;
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<16} {:>7} {:>9} {:>9} {:<20}",
        "ID", "User", "Score", "Accuracy", "Duration", "Started"
    );
    println!("{}", "-".repeat(72));
    for row in sessions {
        let s = &row.session;
        println!(
            "{:<6} {:<16} {:>7} {:>9} {:>8}s {:<20}",
            s.id,
            row.username.as_deref().unwrap_or("(anonymous)"),
            format!("{}/{}", s.score, s.total_questions),
            s.accuracy_display(),
            s.session_duration,
            s.started_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}
