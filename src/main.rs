/// Entry point and game loop.

use std::time::Instant;

use pushgrid::config::GameConfig;
use pushgrid::sim::event::GameEvent;
use pushgrid::sim::level;
use pushgrid::sim::step::{self, FrameInput};
use pushgrid::sim::world::{GameState, Phase};
use pushgrid::ui::gamepad::GamepadState;
use pushgrid::ui::input::{self, InputState};
use pushgrid::ui::renderer::Renderer;
use pushgrid::ui::sound::SoundEngine;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = GameConfig::load();
    let levels = level::load_levels(&config);
    log::info!("{} levels available", levels.len());

    let mut state = match GameState::new(levels, config.rollback, config.timing.move_delay) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Cannot start: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();
    let honor_release = match renderer.init() {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let sound = SoundEngine::new();

    let result = game_loop(&mut state, &mut renderer, sound.as_ref(), &config, honor_release);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!("Thanks for playing Pushgrid!");
}

fn game_loop(
    state: &mut GameState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    honor_release: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = honor_release;
    let mut gp = GamepadState::new(&config.gamepad);
    if gp.connected {
        log::info!("gamepad detected");
    }

    loop {
        kb.drain_events();
        gp.update();
        let now = Instant::now();

        if kb.ctrl_c_pressed() {
            break;
        }

        match handle_meta(state, &kb, &gp, now)? {
            Meta::Quit => break,
            Meta::Events(events) => play_sounds(sound, &events),
            Meta::None => {
                let input = FrameInput { movement: kb.movement().or_else(|| gp.movement()) };
                let events = step::step(state, input, now);
                play_sounds(sound, &events);
            }
        }

        renderer.render(state)?;
        std::thread::sleep(config.timing.frame);
    }

    Ok(())
}

enum Meta {
    None,
    Events(Vec<GameEvent>),
    Quit,
}

/// One-shot keys: start, restart, level switching, leaving.
/// Anything handled here consumes the frame's movement.
fn handle_meta(
    state: &mut GameState,
    kb: &InputState,
    gp: &GamepadState,
    now: Instant,
) -> Result<Meta, Box<dyn std::error::Error>> {
    let cancel = kb.any_pressed(input::KEYS_CANCEL) || gp.cancel_pressed();

    match state.phase {
        Phase::Title => {
            if cancel || kb.any_pressed(input::KEYS_QUIT) {
                return Ok(Meta::Quit);
            }
            if kb.any_pressed(input::KEYS_CONFIRM) || gp.confirm_pressed() {
                let index = state.current_level;
                return Ok(Meta::Events(step::load_level(state, index, now)?));
            }
            Ok(Meta::None)
        }
        Phase::Playing => {
            if cancel {
                state.phase = Phase::Title;
                return Ok(Meta::Events(vec![]));
            }
            if kb.any_pressed(input::KEYS_RESTART) || gp.restart_pressed() {
                return Ok(Meta::Events(step::restart_level(state, now)));
            }
            if kb.any_pressed(input::KEYS_NEXT) || gp.next_level_pressed() {
                return Ok(Meta::Events(step::change_level(state, 1, now)));
            }
            if kb.any_pressed(input::KEYS_PREV) || gp.prev_level_pressed() {
                return Ok(Meta::Events(step::change_level(state, -1, now)));
            }
            Ok(Meta::None)
        }
    }
}

fn play_sounds(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::Moved { pushed, .. } if pushed.is_empty() => sfx.play_step(),
            GameEvent::Moved { .. } => sfx.play_shove(),
            GameEvent::Refused { .. } => sfx.play_thud(),
            _ => {}
        }
    }
}
