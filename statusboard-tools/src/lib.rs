//! Display sinks for the statusboard daemon.
//!
//! `ConsoleDisplay` renders frames in a terminal: the 128x64 panel maps
//! onto a grid of 18x4 character cells, one cell per glyph of the page
//! font. With the `oled` feature, `oled::OledDisplay` drives the real panel.

#[cfg(feature = "oled")]
pub mod oled;

use statusboard::display::{
    text_width, Anchor, DisplayError, DisplaySink, DrawOp, Frame, Icon, FONT_SIZE, GLYPH_WIDTH,
    LINES, WIDTH,
};

use std::io::{self, Write};

use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::{cursor, terminal, QueueableCommand};

pub const COLUMNS: usize = (WIDTH / GLYPH_WIDTH) as usize;
pub const ROWS: usize = LINES.len();

/// Lay out `frame` as `ROWS` strings of `COLUMNS` characters.
pub fn render_grid(frame: &Frame) -> Vec<String> {
    let mut grid = vec![vec![' '; COLUMNS]; ROWS];
    for op in frame.ops() {
        match op {
            DrawOp::Rect { filled: true, .. } => {
                for row in grid.iter_mut() {
                    row.fill(' ');
                }
            }
            DrawOp::Rect { .. } => {}
            DrawOp::Text { at, text, anchor } => {
                let left = match anchor {
                    Anchor::Left => at.x,
                    Anchor::Right => at.x + 1 - text_width(text),
                };
                put(&mut grid, row_of(at.y), left.max(0) / GLYPH_WIDTH, text);
            }
            DrawOp::Bitmap { at, icon } => match icon {
                Icon::NetUp => put(&mut grid, row_of(at.y), 0, "^"),
                Icon::NetDown => put(&mut grid, row_of(at.y), 0, "v"),
                _ => {
                    // Full screen icons: centered name on the second line.
                    let label = format!("[{}]", icon);
                    let col = (COLUMNS as i32 - label.len() as i32).max(0) / 2;
                    put(&mut grid, 1, col, &label);
                }
            },
        }
    }
    grid.into_iter().map(|row| row.into_iter().collect()).collect()
}

fn row_of(y: i32) -> usize {
    (y / FONT_SIZE).clamp(0, ROWS as i32 - 1) as usize
}

fn put(grid: &mut [Vec<char>], row: usize, col: i32, text: &str) {
    let cells = grid[row].iter_mut().skip(col as usize);
    for (cell, c) in cells.zip(text.chars()) {
        *cell = c;
    }
}

/// Display sink drawing into a terminal.
pub struct ConsoleDisplay<W: Write + Send> {
    out: W,
    visible: bool,
}

impl ConsoleDisplay<io::Stdout> {
    pub fn stdout() -> ConsoleDisplay<io::Stdout> {
        ConsoleDisplay::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(out: W) -> ConsoleDisplay<W> {
        ConsoleDisplay { out, visible: true }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, rows: &[String], dim: bool) -> io::Result<()> {
        let border = format!("+{}+", "-".repeat(COLUMNS));
        self.out
            .queue(terminal::Clear(terminal::ClearType::All))?
            .queue(cursor::MoveTo(0, 0))?
            .queue(Print(&border))?;
        if dim {
            self.out.queue(SetAttribute(Attribute::Dim))?;
        }
        for (i, row) in rows.iter().enumerate() {
            self.out
                .queue(cursor::MoveTo(0, i as u16 + 1))?
                .queue(Print(format!("|{:<width$}|", row, width = COLUMNS)))?;
        }
        self.out
            .queue(SetAttribute(Attribute::Reset))?
            .queue(cursor::MoveTo(0, ROWS as u16 + 1))?
            .queue(Print(&border))?
            .queue(cursor::MoveToNextLine(1))?;
        self.out.flush()
    }
}

fn sink_error(err: io::Error) -> DisplayError {
    if err.kind() == io::ErrorKind::BrokenPipe {
        DisplayError::Disconnected
    } else {
        DisplayError::IO(err)
    }
}

impl<W: Write + Send> DisplaySink for ConsoleDisplay<W> {
    fn flush(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        if !self.visible {
            return Ok(());
        }
        let rows = render_grid(frame);
        self.draw(&rows, false).map_err(sink_error)
    }

    fn show(&mut self) -> Result<(), DisplayError> {
        self.visible = true;
        Ok(())
    }

    fn hide(&mut self) -> Result<(), DisplayError> {
        self.visible = false;
        let mut rows = vec![String::new(); ROWS];
        rows[1] = format!("{:^width$}", "(display off)", width = COLUMNS);
        self.draw(&rows, true).map_err(sink_error)
    }
}
