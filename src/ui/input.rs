/// Keyboard state tracker.
///
/// Movement repeats while an arrow / WASD key is held; everything else
/// (restart, level switching, confirm) fires once per press.
///
/// Release events are honored only when the terminal reports them.
/// Otherwise a key counts as released `HOLD_TIMEOUT` after its last
/// Press/Repeat event.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::grid::Direction;

const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Priority among several held movement keys.
pub const HELD_ORDER: [Direction; 4] = [Direction::Down, Direction::Up, Direction::Right, Direction::Left];

// ── Key bindings ──

pub const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
pub const KEYS_NEXT: &[KeyCode] = &[KeyCode::Char('n'), KeyCode::Char('N'), KeyCode::PageDown];
pub const KEYS_PREV: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::PageUp];
pub const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
pub const KEYS_CANCEL: &[KeyCode] = &[KeyCode::Esc];
pub const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

/// Arrow keys and WASD.
pub fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Direction::Right),
        _ => None,
    }
}

pub struct InputState {
    /// Last Press/Repeat time per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    /// Every key event of the last drain, modifiers included.
    raw_events: Vec<KeyEvent>,
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain pending terminal events without blocking. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        let now = Instant::now();
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.record(key, now),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("input: read failed: {e}");
                    break;
                }
            }
        }
        self.expire(now);
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                if !self.is_held_at(key.code, now) {
                    self.fresh_presses.push(key.code);
                }
                self.last_active.insert(key.code, now);
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, t| now.saturating_duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Edge trigger: pressed during the last drain.
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    /// Held movement direction. A fresh press wins over an older held key.
    pub fn movement(&self) -> Option<Direction> {
        if let Some(d) = self.fresh_presses.iter().rev().find_map(|c| direction_for(*c)) {
            return Some(d);
        }
        let now = Instant::now();
        HELD_ORDER.into_iter().find(|d| {
            self.last_active.keys()
                .any(|c| direction_for(*c) == Some(*d) && self.is_held_at(*c, now))
        })
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    // ── Internal ──

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .map_or(false, |t| now.saturating_duration_since(*t) < HOLD_TIMEOUT)
    }
}
