// Entry point for the console Minesweeper game
// Initializes logging and configuration, then hands off to the game loop

use std::error::Error;

// Module declarations
mod csw_color; // Cross-platform color matching utilities
mod csw_game;  // Core game logic and configuration
mod csw_ui;    // Console rendering, input parsing, and the driver loop

use csw_game::load_or_create_config;
use csw_ui::run;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    // Log to stderr so the board output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Load or create user configuration (board size, preferences)
    let mut cfg = load_or_create_config();

    // Play one game on the configured board
    run(&mut cfg)
}
