//! Local player movement on a wrap-around stage.

use peerlink::prelude::{PlayerControlState, Position2D};
use rand::Rng;

/// Units moved per frame-time unit while a direction is held.
pub const SPEED: f32 = 6.0;
/// Ticks per second that one frame-time unit corresponds to.
const FRAME_RATE: f32 = 60.0;

/// The playfield. Sprites may drift `offset` units past any edge before
/// reappearing on the opposite side.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    pub width: f32,
    pub height: f32,
    pub offset: f32,
}

impl Default for Stage {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            offset: 92.0,
        }
    }
}

impl Stage {
    /// Moves `position` by the held directions over `dt_secs`, then wraps it.
    ///
    /// Left wins over right and up wins over down when both are held.
    pub fn step(&self, position: Position2D, control: PlayerControlState, dt_secs: f32) -> Position2D {
        let delta = SPEED * dt_secs * FRAME_RATE;
        let mut x = position.x;
        let mut y = position.y;

        if control.left {
            x -= delta;
        } else if control.right {
            x += delta;
        }
        if control.up {
            y -= delta;
        } else if control.down {
            y += delta;
        }

        self.wrap(Position2D::new(x, y))
    }

    pub fn wrap(&self, position: Position2D) -> Position2D {
        let Position2D { mut x, mut y } = position;
        if x < -self.offset {
            x = self.width + self.offset;
        }
        if y < -self.offset {
            y = self.height + self.offset;
        }
        if x > self.width + self.offset {
            x = -self.offset;
        }
        if y > self.height + self.offset {
            y = -self.offset;
        }
        Position2D::new(x, y)
    }
}

/// A random walk: holds a direction for a while, then picks another.
#[derive(Debug)]
pub struct Wanderer {
    pub position: Position2D,
    pub control: PlayerControlState,
    stage: Stage,
    /// Ticks left before picking a new direction.
    hold_ticks: u32,
}

impl Wanderer {
    /// Starts somewhere in the upper-left of the stage.
    pub fn spawn(stage: Stage, rng: &mut impl Rng) -> Self {
        Self {
            position: Position2D::new(
                rng.random_range(0..600) as f32,
                rng.random_range(0..400) as f32,
            ),
            control: PlayerControlState::default(),
            stage,
            hold_ticks: 0,
        }
    }

    /// Advances one tick.
    pub fn tick(&mut self, dt_secs: f32, rng: &mut impl Rng) {
        if self.hold_ticks == 0 {
            let was_moving = self.control.is_moving();
            self.control = random_direction(rng);
            self.hold_ticks = rng.random_range(30..120);
            if was_moving != self.control.is_moving() {
                tracing::debug!(moving = !was_moving, "wanderer changed pace");
            }
        } else {
            self.hold_ticks -= 1;
        }
        self.position = self.stage.step(self.position, self.control, dt_secs);
    }
}

/// At most one horizontal and one vertical direction, possibly none.
fn random_direction(rng: &mut impl Rng) -> PlayerControlState {
    let horizontal = rng.random_range(0..3u8);
    let vertical = rng.random_range(0..3u8);
    PlayerControlState::new(vertical == 1, vertical == 2, horizontal == 1, horizontal == 2)
}
