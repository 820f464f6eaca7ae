//! SSD1306 OLED panel on a Linux I2C bus.
//!
//! Frames are rasterised with embedded-graphics into the driver's buffer
//! and sent in one flush. Icons have no bitmaps here: page icons are drawn
//! as a framed label, the network arrows as small triangles.

use statusboard::display::{Anchor, DisplayError, DisplaySink, DrawOp, Frame, Icon, FONT_SIZE};

use std::fmt;

use embedded_graphics::mono_font::iso_8859_1::FONT_7X14;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle, Triangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use linux_embedded_hal::I2cdev;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

pub const I2C_BUS: &str = "/dev/i2c-1";

/// Side of the square page icons.
const ICON_SIZE: i32 = 64;
/// Width of the network arrows.
const ARROW_WIDTH: i32 = 6;

type Panel =
    Ssd1306<I2CInterface<I2cdev>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

fn driver_err(err: impl fmt::Debug) -> DisplayError {
    DisplayError::Driver(format!("{:?}", err))
}

/// Draw the ops of `frame` onto `target`, in order.
pub fn rasterize<D>(frame: &Frame, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let font = MonoTextStyle::new(&FONT_7X14, BinaryColor::On);
    for op in frame.ops() {
        match op {
            DrawOp::Text { at, text, anchor } => {
                let alignment = match anchor {
                    Anchor::Left => Alignment::Left,
                    Anchor::Right => Alignment::Right,
                };
                let style = TextStyleBuilder::new()
                    .alignment(alignment)
                    .baseline(Baseline::Top)
                    .build();
                Text::with_text_style(text, Point::new(at.x, at.y), font, style).draw(target)?;
            }
            DrawOp::Rect { from, to, filled } => {
                let style = if *filled {
                    PrimitiveStyle::with_fill(BinaryColor::Off)
                } else {
                    PrimitiveStyle::with_stroke(BinaryColor::On, 1)
                };
                Rectangle::with_corners(Point::new(from.x, from.y), Point::new(to.x, to.y))
                    .into_styled(style)
                    .draw(target)?;
            }
            DrawOp::Bitmap { at, icon } => {
                let origin = Point::new(at.x, at.y);
                match icon {
                    Icon::NetUp | Icon::NetDown => {
                        let (tip, base) = if *icon == Icon::NetUp {
                            (2, FONT_SIZE - 4)
                        } else {
                            (FONT_SIZE - 4, 2)
                        };
                        Triangle::new(
                            origin + Point::new(ARROW_WIDTH / 2, tip),
                            origin + Point::new(0, base),
                            origin + Point::new(ARROW_WIDTH, base),
                        )
                        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                        .draw(target)?;
                    }
                    _ => {
                        Rectangle::new(origin, Size::new(ICON_SIZE as u32, ICON_SIZE as u32))
                            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
                            .draw(target)?;
                        let style = TextStyleBuilder::new()
                            .alignment(Alignment::Center)
                            .baseline(Baseline::Middle)
                            .build();
                        let center = origin + Point::new(ICON_SIZE / 2, ICON_SIZE / 2);
                        Text::with_text_style(icon.name(), center, font, style).draw(target)?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Display sink for a 128x64 SSD1306 panel.
pub struct OledDisplay {
    panel: Panel,
}

impl OledDisplay {
    /// Open the panel on `bus` (usually `I2C_BUS`) and blank it.
    pub fn open(bus: &str) -> Result<OledDisplay, DisplayError> {
        let i2c = I2cdev::new(bus).map_err(std::io::Error::other)?;
        let interface = I2CDisplayInterface::new(i2c);
        let mut panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        panel.init().map_err(driver_err)?;
        panel.clear_buffer();
        panel.flush().map_err(driver_err)?;
        Ok(OledDisplay { panel })
    }
}

impl DisplaySink for OledDisplay {
    fn flush(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        self.panel.clear_buffer();
        rasterize(frame, &mut self.panel).map_err(driver_err)?;
        self.panel.flush().map_err(driver_err)
    }

    fn show(&mut self) -> Result<(), DisplayError> {
        self.panel.set_display_on(true).map_err(driver_err)
    }

    fn hide(&mut self) -> Result<(), DisplayError> {
        self.panel.set_display_on(false).map_err(driver_err)
    }
}
