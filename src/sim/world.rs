/// GameState: everything the main loop and renderer need about a session.
///
/// `world` is the live puzzle; `base` is the same level as loaded and is
/// never mutated, so a restart is a clone. Counters and the status message
/// are presentation-only and never feed back into the push engine.

use std::time::{Duration, Instant};

use crate::domain::push::Rollback;
use crate::domain::world::World;
use crate::sim::level::{LevelDef, LevelError};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
}

/// Rate limit on moves: at most one accepted move per `delay`.
#[derive(Clone, Debug)]
pub struct MoveCooldown {
    delay: Duration,
    last: Option<Instant>,
}

impl MoveCooldown {
    pub fn new(delay: Duration) -> Self {
        MoveCooldown { delay, last: None }
    }

    /// Admit a move at `now` if `delay` has passed since the last admitted
    /// one. Only admitted moves restart the clock.
    pub fn try_accept(&mut self, now: Instant) -> bool {
        let ready = self.last
            .map_or(true, |t| now.saturating_duration_since(t) >= self.delay);
        if ready {
            self.last = Some(now);
        }
        ready
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

pub struct GameState {
    // ── Puzzle ──
    pub world: World,
    /// Level as loaded. Never mutated; `restart_level` clones it.
    pub base: World,
    pub rollback: Rollback,

    // ── Levels ──
    pub levels: Vec<LevelDef>,
    pub current_level: usize,
    pub level_name: String,

    // ── Meta ──
    pub phase: Phase,
    pub moves: u32,
    pub refused: u32,
    pub cooldown: MoveCooldown,

    // ── UI ──
    pub message: String,
    message_until: Option<Instant>,
}

impl GameState {
    /// Start on the title screen with the first level loaded behind it.
    pub fn new(levels: Vec<LevelDef>, rollback: Rollback, move_delay: Duration) -> Result<Self, LevelError> {
        let first = levels.first().ok_or(LevelError::Empty)?;
        let world = first.build()?;
        let level_name = first.name.clone();
        Ok(GameState {
            base: world.clone(),
            world,
            rollback,
            levels,
            current_level: 0,
            level_name,
            phase: Phase::Title,
            moves: 0,
            refused: 0,
            cooldown: MoveCooldown::new(move_delay),
            message: String::new(),
            message_until: None,
        })
    }

    /// Install a freshly built level and reset the session counters.
    pub fn install_level(&mut self, index: usize, world: World) {
        self.current_level = index;
        self.level_name = self.levels[index].name.clone();
        self.base = world.clone();
        self.world = world;
        self.moves = 0;
        self.refused = 0;
        self.cooldown.reset();
    }

    /// Show `msg` until `now + duration`.
    pub fn set_message(&mut self, msg: &str, now: Instant, duration: Duration) {
        self.message = msg.to_string();
        self.message_until = Some(now + duration);
    }

    pub fn expire_message(&mut self, now: Instant) {
        if self.message_until.map_or(false, |t| now >= t) {
            self.message.clear();
            self.message_until = None;
        }
    }
}
