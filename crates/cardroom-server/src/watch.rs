//! The `watch` command: join a table and log every state change.

use std::time::Duration;

use cardroom::{ClientConfig, GameClient};
use cardroom_protocol::GameSnapshot;

use crate::error::CliError;

/// Connects, joins as `name`, and logs snapshots until the server goes
/// away or the process is interrupted.
pub async fn run(url: &str, name: &str, color: Option<&str>) -> Result<(), CliError> {
    let mut client = GameClient::new(ClientConfig::default());
    let player_id = client.connect(url).await?;
    client.set_player_info(name, color).await?;
    tracing::info!(%player_id, name, "watching");

    let mut updates = client.subscribe();
    let mut liveness = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(snapshot) = updates.borrow_and_update().clone() {
                    log_snapshot(&snapshot);
                }
            }
            _ = liveness.tick() => {
                if !client.is_connected() {
                    tracing::info!("server closed the connection");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, leaving");
                client.disconnect().await?;
                break;
            }
        }
    }
    Ok(())
}

fn log_snapshot(snapshot: &GameSnapshot) {
    let judge = snapshot.judge().map(|p| p.name.as_str()).unwrap_or("-");
    let prompt = snapshot.prompt.as_ref().map(|p| p.text.as_str()).unwrap_or("-");
    tracing::info!(
        revision = snapshot.revision,
        phase = %snapshot.phase,
        round = snapshot.round,
        players = snapshot.players.len(),
        judge,
        prompt,
        "state"
    );
    for player in &snapshot.players {
        tracing::debug!(
            id = %player.id,
            name = %player.name,
            role = ?player.role,
            score = player.score,
            submitted = !player.selected.is_empty(),
            "player"
        );
    }
    if let Some(champion) = snapshot.champion.and_then(|id| snapshot.player(id)) {
        tracing::info!(name = %champion.name, score = champion.score, "game over");
    }
}
