//! SSD1306-family OLED panel on I2C.

use crate::indicator::{signal_bars, StatusView, Surface};
use anyhow::{anyhow, Context, Result};
use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{Dimensions, Point},
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    primitives::{Primitive, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle},
    text::{Baseline, Text},
    Drawable,
};
use linux_embedded_hal::I2cdev;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::size::{DisplaySize128x32, DisplaySize128x64, DisplaySize64x48, DisplaySize96x16};
use ssd1306::{I2CDisplayInterface, Ssd1306};
use std::path::Path;
use tracing::info;
use wifisetup_common::{DeviceConfig, SetupError};

const TEXT_ORIGIN: Point = Point::new(5, 5);
const ICON_BASELINE_Y: i32 = 18;
const ICON_RIGHT_MARGIN: i32 = 19;

type Panel<SIZE> = Ssd1306<I2CInterface<I2cdev>, SIZE, BufferedGraphicsMode<SIZE>>;

struct OledSurface<SIZE: DisplaySize> {
    display: Panel<SIZE>,
    icon_x: i32,
}

impl<SIZE: DisplaySize> OledSurface<SIZE> {
    fn open(bus: &Path, address: u8, size: SIZE, width: u32) -> Result<Self> {
        let i2c = I2cdev::new(bus).with_context(|| format!("opening I2C bus {}", bus.display()))?;
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);
        let mut display =
            Ssd1306::new(interface, size, DisplayRotation::Rotate0).into_buffered_graphics_mode();
        display
            .init()
            .map_err(|e| anyhow!("display init failed at 0x{:02x}: {:?}", address, e))?;

        Ok(Self {
            display,
            icon_x: width as i32 - ICON_RIGHT_MARGIN,
        })
    }
}

impl<SIZE> Surface for OledSurface<SIZE>
where
    SIZE: DisplaySize + Send,
    SIZE::Buffer: Send,
{
    fn render(&mut self, view: &StatusView) -> Result<()> {
        self.display.clear_buffer();

        let frame = self.display.bounding_box();
        frame
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut self.display)
            .map_err(|e| anyhow!("frame draw failed: {:?}", e))?;

        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        Text::with_baseline(&view.text, TEXT_ORIGIN, style, Baseline::Top)
            .draw(&mut self.display)
            .map_err(|e| anyhow!("text draw failed: {:?}", e))?;

        if let Some(strength) = view.signal {
            draw_signal_icon(
                &mut self.display,
                Point::new(self.icon_x, ICON_BASELINE_Y),
                strength,
            )
            .map_err(|e| anyhow!("icon draw failed: {:?}", e))?;
        }

        self.display
            .flush()
            .map_err(|e| anyhow!("display flush failed: {:?}", e))
    }

    fn set_power(&mut self, on: bool) -> Result<()> {
        self.display
            .set_display_on(on)
            .map_err(|e| anyhow!("display power change failed: {:?}", e))
    }
}

/// Four bars of increasing height, bottom-aligned on `origin.y`.
fn draw_signal_icon<D>(target: &mut D, origin: Point, strength: u8) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    for (i, filled) in signal_bars(strength).into_iter().enumerate() {
        let i = i as i32;
        let height = (i + 1) * 3;
        let style = PrimitiveStyleBuilder::new()
            .stroke_color(BinaryColor::On)
            .stroke_width(1)
            .fill_color(if filled { BinaryColor::On } else { BinaryColor::Off })
            .build();
        Rectangle::with_corners(
            Point::new(origin.x + i * 4, origin.y - height),
            Point::new(origin.x + i * 4 + 2, origin.y),
        )
        .into_styled(style)
        .draw(target)?;
    }
    Ok(())
}

/// Open the panel described by `config`.
pub fn open_display(config: &DeviceConfig) -> Result<Box<dyn Surface>> {
    let bus = config.i2c_bus.as_path();
    let address = config.i2c_address;
    let (width, height) = (config.display_width, config.display_height);

    let surface: Box<dyn Surface> = match (width, height) {
        (128, 64) => Box::new(OledSurface::open(bus, address, DisplaySize128x64, width)?),
        (128, 32) => Box::new(OledSurface::open(bus, address, DisplaySize128x32, width)?),
        (96, 16) => Box::new(OledSurface::open(bus, address, DisplaySize96x16, width)?),
        (64, 48) => Box::new(OledSurface::open(bus, address, DisplaySize64x48, width)?),
        _ => return Err(SetupError::UnsupportedDisplay { width, height }.into()),
    };

    info!(
        "[BOOT] Display {}x{} ready on {} at 0x{:02x}",
        width,
        height,
        bus.display(),
        address
    );
    Ok(surface)
}
