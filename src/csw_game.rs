// Core game logic and configuration management
// Handles minefield generation, move handling, flood-fill reveal, win/loss
// detection, and configuration persistence

use directories::ProjectDirs;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// A board position in played notation: 1-based row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Played notation is column-first, matching the input format
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// What the player wants to do with a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Flag, // Toggle a mine flag ("mine" in the input line)
    Free, // Reveal the cell ("free" in the input line)
}

/// One parsed move command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub pos: Coord,
    pub action: Action,
}

impl Move {
    /// Parse a move from one line of input: `X Y free|mine`,
    /// where X is the 1-based column and Y the 1-based row.
    pub fn parse(line: &str) -> Result<Move, GameError> {
        let malformed = || GameError::MalformedInput(line.trim().to_string());
        let mut tokens = line.split_whitespace();
        let (Some(x), Some(y), Some(act)) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(malformed());
        };
        if tokens.next().is_some() {
            return Err(malformed());
        }
        let col: usize = x.parse().map_err(|_| malformed())?;
        let row: usize = y.parse().map_err(|_| malformed())?;
        let action = match act {
            "free" => Action::Free,
            "mine" => Action::Flag,
            _ => return Err(malformed()),
        };
        Ok(Move {
            pos: Coord { row, col },
            action,
        })
    }
}

/// Everything that can go wrong inside the engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("invalid board: {rows}x{cols} with {mines} mines (need rows > 0, cols > 0, 0 <= mines < cells)")]
    InvalidConfig {
        rows: usize,
        cols: usize,
        mines: usize,
    },
    #[error("{0} is outside the board")]
    OutOfBounds(Coord),
    #[error("cannot understand move '{0}', expected: X Y free|mine")]
    MalformedInput(String),
    #[error("the game is over, no further moves are accepted")]
    GameOver,
}

/// Visible state of one cell; the mine attribute lives in a parallel vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Hidden,
    Flagged,
    Revealed(u8), // adjacent mine count, 0-8
}

/// Result of a move, recomputed by the engine after every applied command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ongoing,
    Win(WinKind),
    Loss,
}

/// How the game was won
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinKind {
    AllMinesFlagged,  // every mine flagged, nothing else flagged
    AllSafeRevealed,  // every non-mine cell revealed
}

/// One cell as seen by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellView {
    Mine,    // only produced when the snapshot reveals mines
    Flagged,
    Hidden,
    Clear,   // revealed, no adjacent mines
    Numbered(u8),
}

/// Immutable board view handed to renderers
pub struct Snapshot {
    pub rows: usize,
    pub cols: usize,
    pub mines_remaining: isize,
    cells: Vec<CellView>,
}

impl Snapshot {
    /// Cell view at 0-based (row, col)
    pub fn cell(&self, row: usize, col: usize) -> CellView {
        self.cells[row * self.cols + col]
    }
}

/// The game engine: exclusively owns the board, the mine layout,
/// the flag markers, and all counters. Mutation happens only through
/// `apply_move`.
pub struct Game {
    rows: usize,
    cols: usize,
    mines: usize,            // configured mine count, drives the flag counter
    mine: Vec<bool>,         // mine attribute, set at placement
    marker: Vec<Marker>,     // visible cell state
    flagged: usize,          // number of Flagged markers
    safe_remaining: usize,   // unrevealed non-mine cells
    first_move_taken: bool,  // has the first Free move happened
    outcome: Outcome,
}

impl Game {
    /// Create a game with `mines` mines placed at distinct uniformly
    /// random cells.
    pub fn new(rows: usize, cols: usize, mines: usize) -> Result<Game, GameError> {
        let mut game = Game::empty(rows, cols, mines)?;
        let n = rows * cols;
        let mut rng = thread_rng();
        let mut placed = 0;
        while placed < mines {
            let i = rng.gen_range(0..n);
            if !game.mine[i] {
                game.mine[i] = true;
                placed += 1;
            }
        }
        debug!(rows, cols, mines, "minefield generated");
        Ok(game)
    }

    /// Create a game from an explicit mine layout. Positions must be
    /// distinct and in bounds. Deterministic counterpart of `new` for
    /// tests.
    #[cfg(test)]
    pub fn with_mines_at(rows: usize, cols: usize, positions: &[Coord]) -> Result<Game, GameError> {
        let mut game = Game::empty(rows, cols, positions.len())?;
        for &pos in positions {
            let idx = game.checked_index(pos)?;
            if game.mine[idx] {
                // A duplicate does not describe a valid layout
                return Err(GameError::InvalidConfig {
                    rows,
                    cols,
                    mines: positions.len(),
                });
            }
            game.mine[idx] = true;
        }
        Ok(game)
    }

    fn empty(rows: usize, cols: usize, mines: usize) -> Result<Game, GameError> {
        if rows == 0 || cols == 0 || mines >= rows * cols {
            return Err(GameError::InvalidConfig { rows, cols, mines });
        }
        Ok(Game {
            rows,
            cols,
            mines,
            mine: vec![false; rows * cols],
            marker: vec![Marker::Hidden; rows * cols],
            flagged: 0,
            safe_remaining: rows * cols - mines,
            first_move_taken: false,
            outcome: Outcome::Ongoing,
        })
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Mine counter display value (configured mines - flagged cells).
    /// Can be negative if the player places too many flags.
    pub fn mines_remaining(&self) -> isize {
        self.mines as isize - self.flagged as isize
    }

    /// Convert a played-notation coordinate to a flat index,
    /// rejecting out-of-bounds positions.
    fn checked_index(&self, pos: Coord) -> Result<usize, GameError> {
        if pos.row < 1 || pos.row > self.rows || pos.col < 1 || pos.col > self.cols {
            return Err(GameError::OutOfBounds(pos));
        }
        Ok((pos.row - 1) * self.cols + (pos.col - 1))
    }

    /// Apply one move command. Either the whole move applies or the
    /// board is left untouched. Terminal outcomes are sticky: once the
    /// game is won or lost every further call fails with `GameOver`.
    pub fn apply_move(&mut self, mv: Move) -> Result<Outcome, GameError> {
        if self.outcome != Outcome::Ongoing {
            return Err(GameError::GameOver);
        }
        let idx = self.checked_index(mv.pos)?;
        debug!(col = mv.pos.col, row = mv.pos.row, action = ?mv.action, "applying move");
        match mv.action {
            Action::Flag => match self.marker[idx] {
                Marker::Flagged => {
                    self.marker[idx] = Marker::Hidden;
                    self.flagged -= 1;
                }
                Marker::Hidden => {
                    self.marker[idx] = Marker::Flagged;
                    self.flagged += 1;
                }
                // Flagging an already revealed cell does nothing
                Marker::Revealed(_) => {}
            },
            Action::Free => {
                if !self.first_move_taken {
                    self.first_move_taken = true;
                    if self.mine[idx] {
                        // The first reveal is always safe: the mine under it is
                        // dropped outright, not relocated, so the board ends up
                        // with one mine fewer than configured.
                        self.mine[idx] = false;
                        self.safe_remaining += 1;
                        debug!(col = mv.pos.col, row = mv.pos.row, "dropped mine under first move");
                    }
                }
                if self.mine[idx] {
                    self.outcome = Outcome::Loss;
                    info!(col = mv.pos.col, row = mv.pos.row, "stepped on a mine");
                    return Ok(self.outcome);
                }
                self.explore(idx);
            }
        }
        self.outcome = if self.safe_remaining == 0 {
            Outcome::Win(WinKind::AllSafeRevealed)
        } else if self.flags_match_mines() {
            Outcome::Win(WinKind::AllMinesFlagged)
        } else {
            Outcome::Ongoing
        };
        if let Outcome::Win(kind) = self.outcome {
            info!(?kind, "game won");
        }
        Ok(self.outcome)
    }

    /// Flood-fill reveal with an explicit stack. A popped cell is revealed
    /// with its adjacency count; zero-count cells push every neighbor that
    /// is still exactly `Hidden`, so flagged cells are never auto-revealed
    /// and each cell is revealed at most once.
    fn explore(&mut self, start: usize) {
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if self.mine[idx] || matches!(self.marker[idx], Marker::Revealed(_)) {
                continue;
            }
            if self.marker[idx] == Marker::Flagged {
                // Only the starting cell can be flagged here
                self.flagged -= 1;
            }
            let adj = self.count_mines_around(idx);
            self.marker[idx] = Marker::Revealed(adj);
            self.safe_remaining -= 1;
            if adj == 0 {
                let (row, col) = (idx / self.cols, idx % self.cols);
                for ny in row.saturating_sub(1)..=(row + 1).min(self.rows - 1) {
                    for nx in col.saturating_sub(1)..=(col + 1).min(self.cols - 1) {
                        let n = ny * self.cols + nx;
                        if n != idx && self.marker[n] == Marker::Hidden {
                            stack.push(n);
                        }
                    }
                }
            }
        }
    }

    /// Mines in the edge-clipped 3x3 neighborhood of a cell, excluding
    /// the cell itself.
    fn count_mines_around(&self, idx: usize) -> u8 {
        let (row, col) = (idx / self.cols, idx % self.cols);
        let mut adj = 0u8;
        for ny in row.saturating_sub(1)..=(row + 1).min(self.rows - 1) {
            for nx in col.saturating_sub(1)..=(col + 1).min(self.cols - 1) {
                if (ny, nx) != (row, col) && self.mine[ny * self.cols + nx] {
                    adj += 1;
                }
            }
        }
        adj
    }

    /// True when exactly the configured number of flags is placed and
    /// every one of them sits on a mine.
    fn flags_match_mines(&self) -> bool {
        self.mines > 0
            && self.flagged == self.mines
            && self
                .marker
                .iter()
                .zip(&self.mine)
                .all(|(m, &mine)| *m != Marker::Flagged || mine)
    }

    /// Build a board view for rendering. With `reveal_mines` every mine
    /// shows as a mine regardless of its marker (used for the loss
    /// display); otherwise hidden mines stay indistinguishable from
    /// hidden cells.
    pub fn snapshot(&self, reveal_mines: bool) -> Snapshot {
        let cells = (0..self.rows * self.cols)
            .map(|i| {
                if reveal_mines && self.mine[i] {
                    CellView::Mine
                } else {
                    match self.marker[i] {
                        Marker::Flagged => CellView::Flagged,
                        Marker::Hidden => CellView::Hidden,
                        Marker::Revealed(0) => CellView::Clear,
                        Marker::Revealed(n) => CellView::Numbered(n),
                    }
                }
            })
            .collect();
        Snapshot {
            rows: self.rows,
            cols: self.cols,
            mines_remaining: self.mines_remaining(),
            cells,
        }
    }
}

/// User configuration, persisted to disk as TOML
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Board dimensions used for every game
    pub rows: usize,
    pub cols: usize,

    // Default answer for the mine count prompt
    pub default_mines: usize,

    // Colored board output
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rows: 9,
            cols: 9,
            default_mines: 10,
            color: true,
        }
    }
}

/// Get the configuration file path
/// Uses the platform config directory (e.g. ~/.config/cswpr/cswpr.toml on
/// Linux) and falls back to the current directory if it is unavailable
pub fn config_path() -> Option<PathBuf> {
    if let Ok(exe) = env::current_exe() {
        if let Some(name) = exe.file_stem().and_then(|s| s.to_str()) {
            if let Some(proj) = ProjectDirs::from("io", "cswpr", name) {
                let mut path = proj.config_dir().to_path_buf();
                path.push(format!("{}.toml", name));
                return Some(path);
            } else if let Ok(mut path) = env::current_dir() {
                path.push(format!("{}.toml", name));
                return Some(path);
            }
        }
    }
    None
}

/// Load configuration from disk, or create the default file if missing.
/// A config with an unplayable board size is replaced by the defaults.
pub fn load_or_create_config() -> Config {
    if let Some(path) = config_path() {
        if path.exists() {
            if let Ok(s) = fs::read_to_string(&path) {
                if let Ok(cfg) = toml::from_str::<Config>(&s) {
                    if cfg.rows > 0 && cfg.cols > 0 {
                        return cfg;
                    }
                }
            }
        }
        let cfg = Config::default();
        if let Ok(s) = toml::to_string(&cfg) {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fs::write(&path, s);
        }
        return cfg;
    }
    Config::default()
}

/// Save configuration to disk as TOML
pub fn save_config(cfg: &Config) {
    if let Some(path) = config_path() {
        if let Ok(s) = toml::to_string(cfg) {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fs::write(&path, s);
        }
    }
}
