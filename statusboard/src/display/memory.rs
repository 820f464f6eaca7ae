use super::{DisplayError, DisplaySink, Frame};

/// Display sink that keeps every flushed frame in memory.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    frames: Vec<Frame>,
    visible: bool,
    shows: usize,
    hides: usize,
}

impl MemoryDisplay {
    pub fn new() -> MemoryDisplay {
        MemoryDisplay {
            visible: true,
            ..Default::default()
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Number of `show()` calls seen.
    pub fn shows(&self) -> usize {
        self.shows
    }

    /// Number of `hide()` calls seen.
    pub fn hides(&self) -> usize {
        self.hides
    }
}

impl DisplaySink for MemoryDisplay {
    fn flush(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn show(&mut self) -> Result<(), DisplayError> {
        self.shows += 1;
        self.visible = true;
        Ok(())
    }

    fn hide(&mut self) -> Result<(), DisplayError> {
        self.hides += 1;
        self.visible = false;
        Ok(())
    }
}
