//! Page scheduling
//!
//! The scheduler owns the page set and decides on every tick what, if
//! anything, reaches the display: automatic rotation in auto mode, the
//! screensaver in manual mode, and the two-phase icon/text cadence of a
//! page visit.

mod screensaver;

pub use screensaver::Screensaver;

use crate::display::{self, DisplayError, DisplaySink, Frame, Icon, ICON_POS};
use crate::pages::{Page, TEXT_INTERVAL};

use std::time::{Duration, Instant};

use tracing::{debug, error};

/// How the scheduler moves between pages.
#[derive(Debug, Clone)]
pub enum Mode {
    /// Rotate to the next page every `delay`.
    Auto { delay: Duration },
    /// Buttons navigate; the screensaver blanks an idle display.
    Manual(Screensaver),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Icon,
    Text,
}

struct PageSlot {
    page: Box<dyn Page>,
    error_logged: bool,
    errors_logged: usize,
}

pub struct PageScheduler<D: DisplaySink> {
    pages: Vec<PageSlot>,
    current: usize,
    mode: Mode,
    show_icons: bool,
    phase: RenderPhase,
    entered: bool,
    text_painted: bool,
    last_paint: Option<Instant>,
    last_auto: Instant,
    overlay: Option<Icon>,
    display: D,
}

impl<D: DisplaySink> PageScheduler<D> {
    pub fn new(
        pages: Vec<Box<dyn Page>>,
        mode: Mode,
        show_icons: bool,
        display: D,
        now: Instant,
    ) -> PageScheduler<D> {
        let pages = pages
            .into_iter()
            .map(|page| PageSlot {
                page,
                error_logged: false,
                errors_logged: 0,
            })
            .collect();
        PageScheduler {
            pages,
            current: 0,
            mode,
            show_icons,
            phase: first_phase(show_icons),
            entered: false,
            text_painted: false,
            last_paint: None,
            last_auto: now,
            overlay: None,
            display,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Name of the page being shown.
    pub fn current_page(&self) -> Option<&str> {
        self.pages.get(self.current).map(|slot| slot.page.name())
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Always true in auto mode.
    pub fn is_display_on(&self) -> bool {
        match &self.mode {
            Mode::Auto { .. } => true,
            Mode::Manual(saver) => saver.is_display_on(),
        }
    }

    /// Icon of the power action being shown, if any.
    pub fn overlay(&self) -> Option<Icon> {
        self.overlay
    }

    /// How many times the error of page `index` has been logged.
    pub fn errors_logged(&self, index: usize) -> Option<usize> {
        self.pages.get(index).map(|slot| slot.errors_logged)
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// One scheduling step; called periodically by the render loop.
    pub fn tick(&mut self, now: Instant) -> Result<(), DisplayError> {
        match self.mode {
            Mode::Auto { delay } => {
                if now.saturating_duration_since(self.last_auto) >= delay {
                    self.last_auto = now;
                    self.step_index(1);
                    self.reset();
                }
            }
            Mode::Manual(ref mut saver) => {
                saver.logic(now, &mut self.display)?;
                if !saver.is_display_on() {
                    return Ok(());
                }
            }
        }
        if self.overlay.is_some() {
            return Ok(());
        }
        self.render(now)
    }

    pub fn next(&mut self, now: Instant) -> Result<(), DisplayError> {
        self.navigate(1, now)
    }

    pub fn previous(&mut self, now: Instant) -> Result<(), DisplayError> {
        self.navigate(-1, now)
    }

    /// Start the current page visit over.
    pub fn reset(&mut self) {
        self.phase = first_phase(self.show_icons);
        self.entered = false;
        self.text_painted = false;
        self.last_paint = None;
        self.overlay = None;
        for slot in self.pages.iter_mut() {
            slot.error_logged = false;
            slot.page.reset();
        }
    }

    /// Replace the page with `icon` until the next navigation. Painting the
    /// same overlay again is a no-op.
    pub fn show_overlay(&mut self, icon: Icon, now: Instant) -> Result<(), DisplayError> {
        if self.overlay == Some(icon) {
            return Ok(());
        }
        if let Mode::Manual(saver) = &mut self.mode {
            if !saver.is_display_on() {
                saver.wake(now, &mut self.display)?;
            }
        }
        display::paint(&mut self.display, |frame| {
            frame.bitmap(ICON_POS, icon);
            Ok::<(), DisplayError>(())
        })?;
        self.overlay = Some(icon);
        Ok(())
    }

    fn navigate(&mut self, step: isize, now: Instant) -> Result<(), DisplayError> {
        if self.is_display_on() {
            self.step_index(step);
        }
        self.reset();
        if let Mode::Manual(saver) = &mut self.mode {
            saver.wake(now, &mut self.display)?;
        }
        debug!(index = self.current, "navigated");
        Ok(())
    }

    fn step_index(&mut self, step: isize) {
        let len = self.pages.len() as isize;
        if len > 0 {
            self.current = (self.current as isize + step).rem_euclid(len) as usize;
        }
    }

    fn render(&mut self, now: Instant) -> Result<(), DisplayError> {
        let Some(slot) = self.pages.get_mut(self.current) else {
            return Ok(());
        };
        if !self.entered {
            slot.page.enter();
            self.entered = true;
        }

        if self.phase == RenderPhase::Icon {
            let icon = slot.page.icon();
            display::paint(&mut self.display, |frame| {
                frame.bitmap(ICON_POS, icon);
                Ok::<(), DisplayError>(())
            })?;
            self.last_paint = Some(now);
            self.phase = RenderPhase::Text;
            return Ok(());
        }

        let interval = if self.text_painted {
            slot.page.refresh_interval()
        } else {
            TEXT_INTERVAL
        };
        let due = match self.last_paint {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        };
        if !due {
            return Ok(());
        }

        display::paint(&mut self.display, |frame| {
            if let Err(err) = slot.page.draw(frame) {
                if !slot.error_logged {
                    error!(page = slot.page.name(), "{}", err);
                    slot.error_logged = true;
                    slot.errors_logged += 1;
                }
                *frame = Frame::from_lines(&err.diagnostic());
            }
            Ok::<(), DisplayError>(())
        })?;
        self.last_paint = Some(now);
        self.text_painted = true;
        Ok(())
    }
}

fn first_phase(show_icons: bool) -> RenderPhase {
    if show_icons {
        RenderPhase::Icon
    } else {
        RenderPhase::Text
    }
}
