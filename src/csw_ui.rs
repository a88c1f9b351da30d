// Line-based console interface: board rendering, move input, and the
// driver loop that feeds parsed moves into the game engine

use crossterm::style::{Color, Stylize};
use std::error::Error;
use std::io::{self, BufRead, Write};
use tracing::debug;

use crate::csw_color::WTMatch;
use crate::csw_game::{save_config, CellView, Config, Game, Move, Outcome, Snapshot, WinKind};

const MSG_LOSS: &str = "You stepped on a mine and failed!";
const MSG_WIN_MINES: &str = "Congratulations! You found all the mines!";
const MSG_WIN_CLEARED: &str = "Congratulations! You explored all safe cells!";

/// Display character for one cell
fn glyph(view: CellView) -> char {
    match view {
        CellView::Mine => 'X',
        CellView::Flagged => '*',
        CellView::Hidden => '.',
        CellView::Clear => '/',
        CellView::Numbered(n) => (b'0' + n) as char,
    }
}

/// Classic number coloring; adjusted for the terminal via wtmatch
fn glyph_color(view: CellView) -> Color {
    match view {
        CellView::Mine => Color::Red,
        CellView::Flagged => Color::Yellow,
        CellView::Hidden => Color::DarkGrey,
        CellView::Clear => Color::Grey,
        CellView::Numbered(1) => Color::Blue,
        CellView::Numbered(2) => Color::DarkGreen,
        CellView::Numbered(3) => Color::DarkRed,
        CellView::Numbered(4) => Color::DarkBlue,
        CellView::Numbered(5) => Color::Magenta,
        CellView::Numbered(6) => Color::DarkCyan,
        CellView::Numbered(7) => Color::DarkYellow,
        CellView::Numbered(_) => Color::White,
    }
}

/// Render a snapshot as a plain fixed-width grid: a 1-based column header,
/// one line per row prefixed with its number. The frame characters are
/// decorative; the glyphs are the contract.
pub fn render(snap: &Snapshot) -> String {
    let mut out = String::new();
    out.push_str("    ");
    for c in 1..=snap.cols {
        out.push_str(&format!(" {}", c % 10));
    }
    out.push('\n');
    let dash = "-".repeat(2 * snap.cols + 1);
    out.push_str(&format!("    {dash}\n"));
    for r in 0..snap.rows {
        out.push_str(&format!("{:>3} |", r + 1));
        for c in 0..snap.cols {
            out.push(' ');
            out.push(glyph(snap.cell(r, c)));
        }
        out.push_str(" |\n");
    }
    out.push_str(&format!("    {dash}\n"));
    out
}

/// Write the board to `out`, styled when color is enabled
fn draw<W: Write>(out: &mut W, snap: &Snapshot, color: bool) -> io::Result<()> {
    if !color {
        return out.write_all(render(snap).as_bytes());
    }
    write!(out, "    ")?;
    for c in 1..=snap.cols {
        write!(out, " {}", c % 10)?;
    }
    writeln!(out)?;
    let dash = "-".repeat(2 * snap.cols + 1);
    writeln!(out, "    {dash}")?;
    for r in 0..snap.rows {
        write!(out, "{:>3} |", r + 1)?;
        for c in 0..snap.cols {
            let view = snap.cell(r, c);
            write!(out, " {}", glyph(view).with(glyph_color(view).wtmatch()))?;
        }
        writeln!(out, " |")?;
    }
    writeln!(out, "    {dash}")?;
    Ok(())
}

/// Drive one game to its end: render, read a move, apply, repeat.
/// Recoverable errors (malformed lines, out-of-bounds moves) are reported
/// and the player is asked again. Returns the final outcome; if the input
/// runs dry the game is simply left unfinished.
pub fn play<R: BufRead, W: Write>(
    game: &mut Game,
    input: R,
    out: &mut W,
    color: bool,
) -> io::Result<Outcome> {
    let mut lines = input.lines();
    loop {
        let snap = game.snapshot(false);
        draw(out, &snap, color)?;
        writeln!(out, "Mines remaining: {}", snap.mines_remaining)?;
        write!(out, "Enter move (X Y free|mine): ")?;
        out.flush()?;
        let Some(line) = lines.next() else {
            debug!("input exhausted, leaving the game unfinished");
            return Ok(game.outcome());
        };
        let mv = match Move::parse(&line?) {
            Ok(mv) => mv,
            Err(err) => {
                writeln!(out, "{err}")?;
                continue;
            }
        };
        match game.apply_move(mv) {
            Ok(Outcome::Ongoing) => {}
            Ok(Outcome::Loss) => {
                draw(out, &game.snapshot(true), color)?;
                writeln!(out, "{MSG_LOSS}")?;
                return Ok(Outcome::Loss);
            }
            Ok(outcome @ Outcome::Win(kind)) => {
                draw(out, &game.snapshot(false), color)?;
                let msg = match kind {
                    WinKind::AllMinesFlagged => MSG_WIN_MINES,
                    WinKind::AllSafeRevealed => MSG_WIN_CLEARED,
                };
                writeln!(out, "{msg}")?;
                return Ok(outcome);
            }
            Err(err) => {
                writeln!(out, "{err}")?;
            }
        }
    }
}

/// Ask for the mine count until a valid one is entered.
/// An empty line (or end of input) picks the configured default.
fn prompt_mines<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    cfg: &Config,
) -> io::Result<usize> {
    let cells = cfg.rows * cfg.cols;
    let default = cfg.default_mines.min(cells - 1);
    loop {
        write!(out, "Mines (0-{}, default {}): ", cells - 1, default)?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(default);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(default);
        }
        match trimmed.parse::<usize>() {
            Ok(n) if n < cells => return Ok(n),
            _ => writeln!(out, "Enter a number between 0 and {}", cells - 1)?,
        }
    }
}

/// Terminal entry: prompt for the mine count, play one game on the
/// configured board, remember the chosen count for next time.
pub fn run(cfg: &mut Config) -> Result<(), Box<dyn Error>> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    let mines = prompt_mines(&mut input, &mut out, cfg)?;
    cfg.default_mines = mines;
    let mut game = Game::new(cfg.rows, cfg.cols, mines)?;
    play(&mut game, input, &mut out, cfg.color)?;
    save_config(cfg);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csw_game::{Action, Coord};
    use std::io::Cursor;

    fn mv(col: usize, row: usize, action: Action) -> Move {
        Move {
            pos: Coord { row, col },
            action,
        }
    }

    #[test]
    fn render_matches_the_grid_contract() {
        let mut game = Game::with_mines_at(3, 3, &[Coord { row: 2, col: 2 }]).unwrap();
        game.apply_move(mv(1, 1, Action::Flag)).unwrap();
        game.apply_move(mv(3, 3, Action::Free)).unwrap();
        let expected = "     1 2 3
    -------
  1 | * . . |
  2 | . . . |
  3 | . . 1 |
    -------
";
        assert_eq!(render(&game.snapshot(false)), expected);
    }

    #[test]
    fn render_uses_slash_for_cleared_cells_and_x_for_mines() {
        let mut game = Game::with_mines_at(2, 2, &[]).unwrap();
        game.apply_move(mv(1, 1, Action::Free)).unwrap();
        let text = render(&game.snapshot(false));
        assert_eq!(text.matches('/').count(), 4);

        let game = Game::with_mines_at(2, 2, &[Coord { row: 1, col: 2 }]).unwrap();
        let text = render(&game.snapshot(true));
        assert_eq!(text.matches('X').count(), 1);
        assert_eq!(text.matches('.').count(), 3);
    }

    #[test]
    fn play_reports_a_loss_with_all_mines_shown() {
        let mut game = Game::with_mines_at(2, 2, &[Coord { row: 2, col: 2 }]).unwrap();
        let input = Cursor::new("1 1 free\n2 2 free\n");
        let mut out = Vec::new();
        let outcome = play(&mut game, input, &mut out, false).unwrap();
        assert_eq!(outcome, Outcome::Loss);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(MSG_LOSS));
        assert!(text.contains('X'));
    }

    #[test]
    fn play_reprompts_on_bad_input_and_bad_coordinates() {
        let mut game = Game::with_mines_at(2, 2, &[Coord { row: 2, col: 2 }]).unwrap();
        let input = Cursor::new("dig here\n5 5 free\n2 2 mine\n");
        let mut out = Vec::new();
        let outcome = play(&mut game, input, &mut out, false).unwrap();
        assert_eq!(outcome, Outcome::Win(WinKind::AllMinesFlagged));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("cannot understand move"));
        assert!(text.contains("outside the board"));
        assert!(text.contains(MSG_WIN_MINES));
    }

    #[test]
    fn play_reports_a_cleared_board() {
        let mut game = Game::with_mines_at(2, 2, &[]).unwrap();
        let input = Cursor::new("1 1 free\n");
        let mut out = Vec::new();
        let outcome = play(&mut game, input, &mut out, false).unwrap();
        assert_eq!(outcome, Outcome::Win(WinKind::AllSafeRevealed));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(MSG_WIN_CLEARED));
    }

    #[test]
    fn play_stops_quietly_when_input_runs_dry() {
        let mut game = Game::with_mines_at(2, 2, &[Coord { row: 1, col: 1 }]).unwrap();
        let mut out = Vec::new();
        let outcome = play(&mut game, Cursor::new(""), &mut out, false).unwrap();
        assert_eq!(outcome, Outcome::Ongoing);
    }

    #[test]
    fn mine_prompt_retries_until_valid() {
        let cfg = Config::default();
        let mut input = Cursor::new("many\n81\n10\n");
        let mut out = Vec::new();
        let mines = prompt_mines(&mut input, &mut out, &cfg).unwrap();
        assert_eq!(mines, 10);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Enter a number between 0 and 80").count(), 2);
    }

    #[test]
    fn mine_prompt_defaults_on_empty_input() {
        let cfg = Config::default();
        let mut out = Vec::new();
        let mines = prompt_mines(&mut Cursor::new("\n"), &mut out, &cfg).unwrap();
        assert_eq!(mines, cfg.default_mines);
        let mines = prompt_mines(&mut Cursor::new(""), &mut out, &cfg).unwrap();
        assert_eq!(mines, cfg.default_mines);
    }
}
