//! Display
//!
//! The display is a 128x64 monochrome panel. Pages never talk to the
//! hardware directly: they fill a `Frame` with drawing operations, and the
//! frame is handed to a `DisplaySink` in one piece. `paint()` is the scoped
//! drawing session: it starts from a blank frame and flushes it only if
//! the drawing closure succeeded.
//!
//! Note: the sink is owned by the render context and never shared.

mod memory;

pub use memory::MemoryDisplay;

use std::fmt;
use std::io;

pub const WIDTH: i32 = 128;
pub const HEIGHT: i32 = 64;
pub const FONT_SIZE: i32 = 16;

/// X position of left aligned text.
pub const LEFT: i32 = -1;
/// X position of right anchored text.
pub const RIGHT: i32 = WIDTH - 1;
pub const TOP: i32 = 0;

/// Y positions of the four text lines.
pub const LINE1: i32 = TOP;
pub const LINE2: i32 = TOP + FONT_SIZE;
pub const LINE3: i32 = TOP + 2 * FONT_SIZE;
pub const LINE4: i32 = TOP + 3 * FONT_SIZE;
pub const LINES: [i32; 4] = [LINE1, LINE2, LINE3, LINE4];

/// Where full screen icons are placed.
pub const ICON_POS: Point = Point { x: 32, y: 0 };

/// Approximate advance of one glyph of the 16px font.
pub const GLYPH_WIDTH: i32 = 7;

/// Bitmaps known to the display sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    CpuMem,
    Emmc,
    Hdd,
    Sd,
    Ssd,
    Lan,
    Wifi,
    Docker,
    Poweroff,
    Reboot,
    NetDown,
    NetUp,
}

impl Icon {
    pub fn name(&self) -> &'static str {
        match self {
            Icon::CpuMem => "cpu_mem",
            Icon::Emmc => "emmc",
            Icon::Hdd => "hdd",
            Icon::Sd => "sd",
            Icon::Ssd => "ssd",
            Icon::Lan => "lan",
            Icon::Wifi => "wifi",
            Icon::Docker => "docker",
            Icon::Poweroff => "poweroff",
            Icon::Reboot => "reboot",
            Icon::NetDown => "netdown",
            Icon::NetUp => "netup",
        }
    }

    /// Icon by its configuration name, as used by `icon:` page keys.
    pub fn from_name(name: &str) -> Option<Icon> {
        let icon = match name {
            "cpu_mem" => Icon::CpuMem,
            "emmc" => Icon::Emmc,
            "hdd" => Icon::Hdd,
            "sd" => Icon::Sd,
            "ssd" => Icon::Ssd,
            "lan" => Icon::Lan,
            "wifi" => Icon::Wifi,
            "docker" => Icon::Docker,
            "poweroff" => Icon::Poweroff,
            "reboot" => Icon::Reboot,
            "netdown" => Icon::NetDown,
            "netup" => Icon::NetUp,
            _ => return None,
        };
        Some(icon)
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }
}

/// Horizontal anchor of a text operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `at` is the left edge of the text.
    Left,
    /// `at` is the right edge of the text.
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Bitmap {
        at: Point,
        icon: Icon,
    },
    Text {
        at: Point,
        text: String,
        anchor: Anchor,
    },
    Rect {
        from: Point,
        to: Point,
        filled: bool,
    },
}

/// One full screen worth of drawing operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    ops: Vec<DrawOp>,
}

impl Frame {
    pub fn new() -> Frame {
        Frame::default()
    }

    pub fn bitmap(&mut self, at: Point, icon: Icon) {
        self.ops.push(DrawOp::Bitmap { at, icon });
    }

    pub fn text(&mut self, at: Point, text: impl Into<String>, anchor: Anchor) {
        self.ops.push(DrawOp::Text {
            at,
            text: text.into(),
            anchor,
        });
    }

    /// Left aligned text on a line.
    pub fn left(&mut self, line: i32, text: impl Into<String>) {
        self.text(Point::new(LEFT, line), text, Anchor::Left);
    }

    /// Right anchored text on a line.
    pub fn right(&mut self, line: i32, text: impl Into<String>) {
        self.text(Point::new(RIGHT, line), text, Anchor::Right);
    }

    pub fn rect(&mut self, from: Point, to: Point, filled: bool) {
        self.ops.push(DrawOp::Rect { from, to, filled });
    }

    /// Blank the whole screen.
    pub fn clear(&mut self) {
        self.rect(Point::new(0, 0), Point::new(WIDTH, HEIGHT), true);
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Texts in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Icons in drawing order.
    pub fn icons(&self) -> Vec<Icon> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Bitmap { icon, .. } => Some(*icon),
                _ => None,
            })
            .collect()
    }

    /// A frame with one left aligned text per line, as used for
    /// diagnostics.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Frame {
        let mut frame = Frame::new();
        for (line, text) in LINES.iter().zip(lines) {
            frame.left(*line, text.as_ref());
        }
        frame
    }
}

/// Estimated pixel width of `text` in the page font.
pub fn text_width(text: &str) -> i32 {
    GLYPH_WIDTH * text.chars().count() as i32
}

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    /// The sink is gone for good; rendering cannot continue.
    #[error("display disconnected")]
    Disconnected,
    #[error("display I/O error: {0}")]
    IO(#[from] io::Error),
    #[error("display driver error: {0}")]
    Driver(String),
}

impl DisplayError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, DisplayError::Disconnected)
    }
}

/// Generic interface to the physical display.
pub trait DisplaySink: Send {
    /// Replace the screen content with `frame`.
    fn flush(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    /// Power the panel on.
    fn show(&mut self) -> Result<(), DisplayError>;

    /// Power the panel off (screensaver).
    fn hide(&mut self) -> Result<(), DisplayError>;
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn flush(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        (**self).flush(frame)
    }

    fn show(&mut self) -> Result<(), DisplayError> {
        (**self).show()
    }

    fn hide(&mut self) -> Result<(), DisplayError> {
        (**self).hide()
    }
}

/// Runs one drawing session: `draw` fills a blank frame, which is flushed
/// to `sink` if `draw` returned Ok. Nothing reaches the sink on error.
pub fn paint<D, E, F>(sink: &mut D, draw: F) -> Result<(), E>
where
    D: DisplaySink + ?Sized,
    E: From<DisplayError>,
    F: FnOnce(&mut Frame) -> Result<(), E>,
{
    let mut frame = Frame::new();
    draw(&mut frame)?;
    sink.flush(&frame)?;
    Ok(())
}
