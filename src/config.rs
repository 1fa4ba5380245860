/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing, unreadable or invalid.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::grid::Board;
use crate::domain::push::Rollback;

const APP_DIR: &str = "pushgrid";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Size of the built-in sandbox level.
    pub board: Board,
    pub timing: TimingConfig,
    pub rollback: Rollback,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    /// Minimum interval between two accepted moves.
    pub move_delay: Duration,
    /// Main loop sleep between frames.
    pub frame: Duration,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub restart: Vec<String>,
    pub next_level: Vec<String>,
    pub prev_level: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    board: TomlBoard,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    engine: TomlEngine,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlBoard {
    #[serde(default = "default_width")]
    width: usize,
    #[serde(default = "default_height")]
    height: usize,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_move_delay")]
    move_delay_ms: u64,
    #[serde(default = "default_frame")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
enum TomlRollback {
    Branch,
    Atomic,
}

#[derive(Deserialize, Debug)]
struct TomlEngine {
    #[serde(default = "default_rollback")]
    rollback: TomlRollback,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_next_level")]
    next_level: Vec<String>,
    #[serde(default = "default_prev_level")]
    prev_level: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

// ── Defaults ──

fn default_width() -> usize { 10 }
fn default_height() -> usize { 8 }
fn default_move_delay() -> u64 { 30 }
fn default_frame() -> u64 { 5 }
fn default_rollback() -> TomlRollback { TomlRollback::Branch }

fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_next_level() -> Vec<String> { vec!["R1".into()] }
fn default_prev_level() -> Vec<String> { vec!["L1".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlBoard {
    fn default() -> Self {
        TomlBoard { width: default_width(), height: default_height() }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming { move_delay_ms: default_move_delay(), frame_ms: default_frame() }
    }
}

impl Default for TomlEngine {
    fn default() -> Self {
        TomlEngine { rollback: default_rollback() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            restart: default_restart(),
            next_level: default_next_level(),
            prev_level: default_prev_level(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { levels_dir: default_levels_dir() }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, CWD, XDG data home, system data dir.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Build from TOML text. Invalid text yields the defaults.
    #[cfg(test)]
    pub(crate) fn from_toml_str(text: &str) -> Self {
        let cfg = toml::from_str::<TomlConfig>(text).unwrap_or_default();
        Self::resolve(cfg, &[])
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir = resolve_levels_dir(&toml_cfg.general.levels_dir, search_dirs);

        let mut board = Board::new(toml_cfg.board.width, toml_cfg.board.height);
        if board.is_empty() {
            log::warn!(
                "config: board {}x{} is empty, using {}x{}",
                board.width, board.height, default_width(), default_height()
            );
            board = Board::new(default_width(), default_height());
        }

        GameConfig {
            board,
            timing: TimingConfig {
                move_delay: Duration::from_millis(toml_cfg.timing.move_delay_ms),
                frame: Duration::from_millis(toml_cfg.timing.frame_ms),
            },
            rollback: match toml_cfg.engine.rollback {
                TomlRollback::Branch => Rollback::Branch,
                TomlRollback::Atomic => Rollback::Atomic,
            },
            gamepad: GamepadConfig {
                restart: toml_cfg.gamepad.restart,
                next_level: toml_cfg.gamepad.next_level,
                prev_level: toml_cfg.gamepad.prev_level,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            levels_dir,
        }
    }
}

fn resolve_levels_dir(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    if Path::new(name).is_absolute() {
        return PathBuf::from(name);
    }
    search_dirs.iter()
        .map(|d| d.join(name))
        .find(|p| p.is_dir())
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Candidate directories to search: exe dir + CWD + data dirs (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![];
    let mut add = |p: PathBuf| {
        if !dirs.contains(&p) {
            dirs.push(p);
        }
    };

    if let Ok(exe) = std::env::current_exe() {
        // Follow symlinks so an installed link still finds data next to the binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            add(parent.to_path_buf());
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        add(cwd);
    }
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(home).join(".local/share").join(APP_DIR);
        if xdg.is_dir() {
            add(xdg);
        }
    }
    let sys = PathBuf::from("/usr/share").join(APP_DIR);
    if sys.is_dir() {
        add(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// First readable config.toml wins. A parse error falls back to defaults.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    log::debug!("config: loaded {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    log::warn!("config: {} parse error: {e}; using defaults", path.display());
                    return TomlConfig::default();
                }
            },
            Err(e) => log::warn!("config: could not read {}: {e}", path.display()),
        }
    }
    TomlConfig::default()
}
