//! T6963C graphic/text LCD controller module.
//!
//! The controller (also sold as RA6963) is driven over an 8-bit parallel bus with three control
//! lines: WR (write strobe, active low), C/D (command or data) and RST (reset, active low). This
//! driver is write-only, so the RD and CE lines of the controller have to be tied to their
//! inactive and active levels respectively.
//!
//! See [driver::T6963CDriver] for the operations and [driver::GpioT6963CDriver] for the
//! implementation over GPIO lines.

mod command;
pub mod driver;
mod pins;

pub use command::*;
pub use pins::*;
