//! Headless bot client: wanders around the stage, fires now and then, and
//! logs what it sees of everyone else.
//!
//! ```text
//! cargo run -p wanderer -- [config.json]
//! RUST_LOG=peerlink=debug,wanderer=debug cargo run -p wanderer
//! ```

mod movement;

use std::f32::consts::TAU;

use peerlink::prelude::*;
use rand::Rng;

use crate::movement::{Stage, Wanderer};

/// Chance per tick of firing a shot.
const FIRE_CHANCE: f64 = 0.01;

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// Stands in for a renderer: each peer's "sprite" is just a number, and
/// every change is logged.
#[derive(Default)]
struct LoggingPresenter {
    next_sprite: u32,
}

impl PeerPresenter for LoggingPresenter {
    type Handle = u32;

    fn create_peer(&mut self, peer_id: &PeerId, position: Position2D) -> u32 {
        self.next_sprite += 1;
        tracing::info!(%peer_id, sprite = self.next_sprite, x = position.x, y = position.y, "peer appeared");
        self.next_sprite
    }

    fn move_peer(&mut self, sprite: &mut u32, peer_id: &PeerId, position: Position2D) {
        tracing::debug!(%peer_id, sprite = *sprite, x = position.x, y = position.y, "peer moved");
    }

    fn destroy_peer(&mut self, sprite: u32, peer_id: &PeerId) {
        tracing::info!(%peer_id, sprite, "peer gone");
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), PeerlinkError> {
    init_tracing("info");

    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    let client = PeerlinkClient::from_config(config)?;

    let mut rng = rand::rng();
    let mut wanderer = Wanderer::spawn(Stage::default(), &mut rng);
    tracing::info!(
        endpoint = %client.config().endpoint,
        x = wanderer.position.x,
        y = wanderer.position.y,
        "wanderer starting"
    );

    let run = client.run(LoggingPresenter::default(), |session, tick| {
        wanderer.tick(tick.dt_secs(), &mut rng);
        session.set_control_state(wanderer.control);
        session.set_position(wanderer.position.x, wanderer.position.y);

        if rng.random_bool(FIRE_CHANCE) {
            let angle = rng.random_range(0.0..TAU);
            let power = rng.random_range(0.5..1.0);
            session.fire_weapon(angle, power);
        }
    });

    tokio::select! {
        result = run => {
            let reason = result?;
            tracing::info!(%reason, "disconnected");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
        }
    }
    Ok(())
}
