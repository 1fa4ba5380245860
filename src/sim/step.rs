/// The step function: advances the session by one tick.
///
/// Processing order:
///   1. Message expiry
///   2. Cooldown gate (at most one accepted move per `move_delay`)
///   3. Push resolution for the player
///   4. Counters + events
///
/// Level switching (`load_level`, `change_level`) and `restart_level`
/// live here too, since they are the only other writers of `GameState`.

use std::time::{Duration, Instant};

use crate::domain::grid::Direction;
use crate::domain::push;
use super::event::GameEvent;
use super::level::LevelError;
use super::world::{GameState, Phase};

const NOTICE: Duration = Duration::from_millis(1500);

/// Per-tick input: at most one movement direction.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<Direction>,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(state: &mut GameState, input: FrameInput, now: Instant) -> Vec<GameEvent> {
    if state.phase != Phase::Playing { return vec![]; }

    state.expire_message(now);

    let direction = match input.movement {
        Some(d) => d,
        None => return vec![],
    };
    if !state.cooldown.try_accept(now) { return vec![]; }

    resolve_player_move(state, direction, now)
}

fn resolve_player_move(state: &mut GameState, direction: Direction, now: Instant) -> Vec<GameEvent> {
    let player = state.world.player_id();
    let report = push::push_with(&mut state.world, player, direction, state.rollback);
    let mut events = Vec::new();

    if report.accepted {
        state.moves += 1;
        let pushed = report.moved.into_iter().filter(|&id| id != player).collect();
        events.push(GameEvent::Moved { direction, pushed });
    } else {
        state.refused += 1;
        events.push(GameEvent::Refused { direction });
        if report.is_partial() {
            log::debug!("push {direction} refused but {:?} stay shifted", report.moved);
            state.set_message("Blocked, but something shifted", now, NOTICE);
            events.push(GameEvent::Stranded { ids: report.moved });
        }
    }

    events
}

// ══════════════════════════════════════════════════════════════
// Level control
// ══════════════════════════════════════════════════════════════

/// Put the current level back the way it was loaded.
pub fn restart_level(state: &mut GameState, now: Instant) -> Vec<GameEvent> {
    let base = state.base.clone();
    state.install_level(state.current_level, base);
    state.set_message("Level restarted", now, NOTICE);
    vec![GameEvent::LevelRestarted]
}

/// Load level `index` and start playing it.
pub fn load_level(state: &mut GameState, index: usize, now: Instant) -> Result<Vec<GameEvent>, LevelError> {
    let def = state.levels.get(index).ok_or(LevelError::NoSuchLevel(index))?;
    let world = def.build()?;
    log::info!("level {} \"{}\" ({}x{}, {} entities)",
        index + 1, def.name, world.board().width, world.board().height, world.len());

    state.install_level(index, world);
    state.phase = Phase::Playing;
    let name = state.level_name.clone();
    state.set_message(&name, now, NOTICE);
    Ok(vec![GameEvent::LevelStarted { index }])
}

/// Step `delta` levels forward or back, wrapping around the list.
/// A level that fails to build is skipped in the same direction.
pub fn change_level(state: &mut GameState, delta: isize, now: Instant) -> Vec<GameEvent> {
    let n = state.levels.len() as isize;
    if n == 0 { return vec![]; }
    let dir = if delta < 0 { -1 } else { 1 };
    let mut idx = state.current_level as isize + delta;

    for _ in 0..n {
        let target = idx.rem_euclid(n) as usize;
        match load_level(state, target, now) {
            Ok(events) => return events,
            Err(e) => {
                log::warn!("level {}: {e}", target + 1);
                idx += dir;
            }
        }
    }
    vec![]
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::Cell;
    use crate::domain::push::Rollback;
    use crate::sim::level::{parse_level, LevelDef};

    const DELAY: Duration = Duration::from_millis(30);

    fn level(src: &str) -> LevelDef {
        parse_level(src).unwrap()
    }

    fn playing(levels: Vec<LevelDef>, rollback: Rollback) -> (GameState, Instant) {
        let t0 = Instant::now();
        let mut gs = GameState::new(levels, rollback, DELAY).unwrap();
        load_level(&mut gs, 0, t0).unwrap();
        (gs, t0)
    }

    fn mv(d: Direction) -> FrameInput {
        FrameInput { movement: Some(d) }
    }

    fn ms(t0: Instant, n: u64) -> Instant {
        t0 + Duration::from_millis(n)
    }

    #[test]
    fn title_phase_ignores_input() {
        let mut gs = GameState::new(vec![level("P.\n")], Rollback::Branch, DELAY).unwrap();
        let events = step(&mut gs, mv(Direction::Right), Instant::now());
        assert!(events.is_empty());
        assert_eq!(gs.world.player().occupies(), &[Cell::new(0, 0)]);
    }

    #[test]
    fn move_and_push_emit_moved() {
        let (mut gs, t0) = playing(vec![level("Pa..\n")], Rollback::Branch);
        let events = step(&mut gs, mv(Direction::Right), t0);
        assert_eq!(events, vec![GameEvent::Moved { direction: Direction::Right, pushed: vec![1] }]);
        assert_eq!(gs.moves, 1);
        assert_eq!(gs.world.get(1).unwrap().occupies(), &[Cell::new(2, 0)]);
    }

    #[test]
    fn no_direction_does_nothing() {
        let (mut gs, t0) = playing(vec![level("P.\n")], Rollback::Branch);
        assert!(step(&mut gs, FrameInput::default(), t0).is_empty());
        assert_eq!(gs.moves, 0);
    }

    #[test]
    fn cooldown_drops_rapid_moves() {
        let (mut gs, t0) = playing(vec![level("P....\n")], Rollback::Branch);
        assert_eq!(step(&mut gs, mv(Direction::Right), t0).len(), 1);
        assert!(step(&mut gs, mv(Direction::Right), ms(t0, 10)).is_empty());
        assert_eq!(step(&mut gs, mv(Direction::Right), ms(t0, 30)).len(), 1);
        assert_eq!(gs.world.player().occupies(), &[Cell::new(2, 0)]);
    }

    #[test]
    fn wall_push_is_refused_and_counted() {
        let (mut gs, t0) = playing(vec![level(".Pa\n")], Rollback::Branch);
        let events = step(&mut gs, mv(Direction::Right), t0);
        assert_eq!(events, vec![GameEvent::Refused { direction: Direction::Right }]);
        assert_eq!(gs.refused, 1);
        assert_eq!(gs.moves, 0);
        assert_eq!(gs.world.player().occupies(), &[Cell::new(1, 0)]);
    }

    const STRANDED: &str = ".......\n..baP..\ncca....\n";

    #[test]
    fn partial_commit_reports_stranded_block() {
        let (mut gs, t0) = playing(vec![level(STRANDED)], Rollback::Branch);
        let events = step(&mut gs, mv(Direction::Left), t0);
        assert_eq!(events, vec![
            GameEvent::Refused { direction: Direction::Left },
            GameEvent::Stranded { ids: vec![1] },
        ]);
        assert_eq!(gs.message, "Blocked, but something shifted");
    }

    #[test]
    fn atomic_mode_never_strands() {
        let (mut gs, t0) = playing(vec![level(STRANDED)], Rollback::Atomic);
        let before = gs.world.get(1).unwrap().occupies().to_vec();
        let events = step(&mut gs, mv(Direction::Left), t0);
        assert_eq!(events, vec![GameEvent::Refused { direction: Direction::Left }]);
        assert_eq!(gs.world.get(1).unwrap().occupies(), before.as_slice());
    }

    #[test]
    fn restart_restores_loaded_layout() {
        let (mut gs, t0) = playing(vec![level("Pa..\n")], Rollback::Branch);
        step(&mut gs, mv(Direction::Right), t0);
        let events = restart_level(&mut gs, ms(t0, 1));
        assert_eq!(events, vec![GameEvent::LevelRestarted]);
        assert_eq!(gs.world.player().occupies(), &[Cell::new(0, 0)]);
        assert_eq!(gs.world.get(1).unwrap().occupies(), &[Cell::new(1, 0)]);
        assert_eq!(gs.moves, 0);
        // Cooldown was reset with the level.
        assert_eq!(step(&mut gs, mv(Direction::Right), ms(t0, 2)).len(), 1);
    }

    #[test]
    fn change_level_wraps_both_ways() {
        let levels = vec![level("# one\nP.\n"), level("# two\n.P\n"), level("# three\nP..\n")];
        let (mut gs, t0) = playing(levels, Rollback::Branch);
        change_level(&mut gs, -1, t0);
        assert_eq!(gs.current_level, 2);
        assert_eq!(gs.level_name, "three");
        change_level(&mut gs, 1, t0);
        assert_eq!(gs.current_level, 0);
    }

    #[test]
    fn change_level_skips_broken_levels() {
        let levels = vec![level("P.\n"), level("..\n"), level("# ok\n.P\n")];
        let (mut gs, t0) = playing(levels, Rollback::Branch);
        let events = change_level(&mut gs, 1, t0);
        assert_eq!(events, vec![GameEvent::LevelStarted { index: 2 }]);
        assert_eq!(gs.level_name, "ok");
    }
}
