//! Value types for group control parameters.

mod brightness;
mod color_mode;
mod hue_saturation;
mod kelvin;
mod scale_factor;
mod transition;
mod window;

pub use brightness::Brightness;
pub use color_mode::ColorMode;
pub use hue_saturation::HueSaturation;
pub use kelvin::{Kelvin, KelvinRange};
pub use scale_factor::ScaleFactor;
pub use transition::Transition;
pub use window::BrightnessWindow;
