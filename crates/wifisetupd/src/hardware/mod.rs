//! Linux hardware adapters: GPIO character device lines and the I2C OLED
//! panel.

mod gpio;
mod oled;

pub use gpio::{CdevButton, CdevLed};
pub use oled::open_display;
