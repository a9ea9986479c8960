//! Button and LED on GPIO character device lines.

use crate::button::ButtonInput;
use crate::indicator::StatusLed;
use anyhow::{Context, Result};
use linux_embedded_hal::gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use std::path::Path;

const CONSUMER_BUTTON: &str = "wifisetup-button";
const CONSUMER_LED: &str = "wifisetup-led";

/// Active-low push button (pressed pulls the line to ground).
pub struct CdevButton {
    handle: LineHandle,
}

impl CdevButton {
    pub fn open(chip_path: &Path, offset: u32) -> Result<Self> {
        let mut chip = Chip::new(chip_path)
            .with_context(|| format!("opening GPIO chip {}", chip_path.display()))?;
        let line = chip
            .get_line(offset)
            .with_context(|| format!("getting button line {}", offset))?;
        let handle = line
            .request(
                LineRequestFlags::INPUT | LineRequestFlags::ACTIVE_LOW,
                0,
                CONSUMER_BUTTON,
            )
            .with_context(|| format!("requesting button line {}", offset))?;
        Ok(Self { handle })
    }
}

impl ButtonInput for CdevButton {
    fn is_pressed(&mut self) -> Result<bool> {
        let value = self.handle.get_value().context("reading button line")?;
        Ok(value != 0)
    }
}

/// Status LED driven high when lit.
pub struct CdevLed {
    handle: LineHandle,
}

impl CdevLed {
    pub fn open(chip_path: &Path, offset: u32) -> Result<Self> {
        let mut chip = Chip::new(chip_path)
            .with_context(|| format!("opening GPIO chip {}", chip_path.display()))?;
        let line = chip
            .get_line(offset)
            .with_context(|| format!("getting LED line {}", offset))?;
        let handle = line
            .request(LineRequestFlags::OUTPUT, 0, CONSUMER_LED)
            .with_context(|| format!("requesting LED line {}", offset))?;
        Ok(Self { handle })
    }
}

impl StatusLed for CdevLed {
    fn set(&mut self, on: bool) -> Result<()> {
        self.handle
            .set_value(u8::from(on))
            .context("writing LED line")?;
        Ok(())
    }
}
