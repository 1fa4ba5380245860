/// Gamepad input tracker using gilrs.
///
/// D-pad and left stick move the player. Actions come from
/// `[gamepad]` in config.toml; defaults:
///   Y             →  Restart level
///   R1 / L1       →  Next / previous level
///   Start / A     →  Confirm
///   Select        →  Back to title / quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::grid::Direction;
use crate::ui::input::HELD_ORDER;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
}

const BTN_COUNT: usize = 10;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" => Some(Btn::L1),
            "R1" | "RB" => Some(Btn::R1),
            "L2" | "LT" => Some(Btn::L2),
            "R2" | "RT" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2 => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

struct ActionMap {
    restart: Vec<Btn>,
    next_level: Vec<Btn>,
    prev_level: Vec<Btn>,
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl ActionMap {
    /// Unknown names are skipped with a warning. An action left with no
    /// valid button keeps `fallback`.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse(action: &str, names: &[String], fallback: &[Btn]) -> Vec<Btn> {
            let btns: Vec<Btn> = names.iter()
                .filter_map(|s| {
                    let b = Btn::from_name(s);
                    if b.is_none() {
                        log::warn!("gamepad: unknown button {s:?} for {action}");
                    }
                    b
                })
                .collect();
            if btns.is_empty() { fallback.to_vec() } else { btns }
        }
        ActionMap {
            restart: parse("restart", &cfg.restart, &[Btn::Y]),
            next_level: parse("next_level", &cfg.next_level, &[Btn::R1]),
            prev_level: parse("prev_level", &cfg.prev_level, &[Btn::L1]),
            confirm: parse("confirm", &cfg.confirm, &[Btn::Start, Btn::A]),
            cancel: parse("cancel", &cfg.cancel, &[Btn::Select]),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    /// D-pad, indexed like `Direction::ALL`.
    dpad: [bool; 4],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,
    pub connected: bool,
}

fn dir_index(d: Direction) -> usize {
    match d {
        Direction::Up => 0,
        Direction::Down => 1,
        Direction::Right => 2,
        Direction::Left => 3,
    }
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                log::debug!("gamepad: gilrs unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [false; 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::from_config(cfg),
            connected,
        }
    }

    pub fn update(&mut self) {
        for b in &mut self.buttons {
            b.just_pressed = false;
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(Axis::LeftStickX, value, _) => self.stick_x = value,
                EventType::AxisChanged(Axis::LeftStickY, value, _) => self.stick_y = value,
                EventType::Connected => {
                    log::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dpad = match gilrs_btn {
            Button::DPadUp => Some(Direction::Up),
            Button::DPadDown => Some(Direction::Down),
            Button::DPadRight => Some(Direction::Right),
            Button::DPadLeft => Some(Direction::Left),
            _ => None,
        };
        if let Some(d) = dpad {
            self.dpad[dir_index(d)] = held;
            return;
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.press(btn, held);
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn press(&mut self, btn: Btn, held: bool) {
        let state = &mut self.buttons[btn as usize];
        if held && !state.held {
            state.just_pressed = true;
        }
        state.held = held;
    }

    // ── Action queries ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    pub fn restart_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.restart)
    }
    pub fn next_level_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.next_level)
    }
    pub fn prev_level_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.prev_level)
    }
    pub fn confirm_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.confirm)
    }
    pub fn cancel_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.cancel)
    }

    /// Held direction from the D-pad, else from the stick.
    /// Stick up is positive Y in gilrs.
    pub fn movement(&self) -> Option<Direction> {
        if let Some(d) = HELD_ORDER.into_iter().find(|d| self.dpad[dir_index(*d)]) {
            return Some(d);
        }
        let (x, y) = (self.stick_x, self.stick_y);
        if x.abs().max(y.abs()) <= STICK_DEADZONE {
            None
        } else if y.abs() >= x.abs() {
            Some(if y > 0.0 { Direction::Up } else { Direction::Down })
        } else {
            Some(if x > 0.0 { Direction::Right } else { Direction::Left })
        }
    }

    // ── Internal ──

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad = [false; 4];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}
