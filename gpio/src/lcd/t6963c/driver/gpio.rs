use crate::delay::Delay;
use crate::lcd::t6963c::driver::{MemoryLayout, T6963CDriver, Timings};
use crate::lcd::t6963c::{Command, DisplayMode, PinMap};
use crate::{GpioActiveLevel, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioResult};
use log::{debug, trace};
use std::time::Duration;

/// The claimed GPIO lines of a T6963C bus, by role.
///
/// WR and RST are claimed active low, so `true` always means asserted. Every line stays claimed
/// until the handle is dropped, whichever way the owner exits.
#[derive(Debug)]
pub struct BusHandle<'a> {
    pin_wr: Box<dyn GpioOutput + 'a>,
    pin_cd: Box<dyn GpioOutput + 'a>,
    pin_reset: Box<dyn GpioOutput + 'a>,
    pin_backlight: Option<Box<dyn GpioOutput + 'a>>,
    data_bus: Box<dyn GpioBusOutput<8> + 'a>,
}

impl<'a> BusHandle<'a> {
    /// Claims all lines of the pin map and sets WR and RST to their inactive levels.
    ///
    /// If any line cannot be claimed, the ones claimed so far are released again.
    pub fn claim<D: GpioDriver>(gpio: &'a D, pins: &PinMap) -> GpioResult<Self> {
        pins.validate()?;

        let pin_wr = gpio.output(pins.wr, GpioActiveLevel::Low)?;
        let pin_cd = gpio.output(pins.cd, GpioActiveLevel::High)?;
        let pin_reset = gpio.output(pins.reset, GpioActiveLevel::Low)?;
        let pin_backlight = match pins.backlight {
            Some(index) => Some(gpio.output(index, GpioActiveLevel::High)?),
            None => None,
        };
        let data_bus = gpio.output_bus(pins.data, GpioActiveLevel::High)?;

        pin_wr.write(false)?;
        pin_reset.write(false)?;

        debug!("Claimed T6963C bus on {:?}", pins);

        Ok(BusHandle {
            pin_wr,
            pin_cd,
            pin_reset,
            pin_backlight,
            data_bus,
        })
    }

    /// Puts one byte on the bus.
    ///
    /// C/D is set first, then WR is asserted, the data lines are driven, and WR is released. The
    /// controller latches the byte on that rising edge of WR.
    pub fn write(&self, data: u8, command: bool) -> GpioResult<()> {
        trace!("Sending: {:08b}, C/D: {}", data, command);

        self.pin_cd.write(command)?;
        self.pin_wr.write(true)?;
        self.data_bus.write_byte(data)?;
        self.pin_wr.write(false)?;

        Ok(())
    }

    pub fn set_reset(&self, asserted: bool) -> GpioResult<()> {
        self.pin_reset.write(asserted)
    }

    pub fn set_backlight(&self, on: bool) -> GpioResult<()> {
        match &self.pin_backlight {
            Some(pin) => pin.write(on),
            None => Err(GpioError::NotSupported),
        }
    }
}

impl Drop for BusHandle<'_> {
    fn drop(&mut self) {
        debug!("Releasing T6963C bus");
    }
}

/// T6963C driver over GPIO lines.
///
/// Every byte is followed by [Timings::settle_after_byte]; the longer delays of the higher level
/// operations come on top of that.
#[derive(Debug)]
pub struct GpioT6963CDriver<'a> {
    bus: BusHandle<'a>,
    delay: Box<dyn Delay + 'a>,
    timings: Timings,
    display_mode: DisplayMode,
    layout: MemoryLayout,
}

impl<'a> GpioT6963CDriver<'a> {
    pub fn new(bus: BusHandle<'a>, delay: impl Delay + 'a) -> Self {
        GpioT6963CDriver {
            bus,
            delay: Box::new(delay),
            timings: Timings::default(),
            display_mode: DisplayMode::OFF,
            layout: MemoryLayout::default(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    fn send(&mut self, data: u8, command: bool) -> GpioResult<()> {
        self.bus.write(data, command)?;
        self.delay.delay(self.timings.settle_after_byte);
        Ok(())
    }
}

impl T6963CDriver for GpioT6963CDriver<'_> {
    fn reset(&mut self) -> GpioResult<()> {
        debug!("Resetting T6963C");

        self.bus.set_reset(true)?;
        self.delay.delay(self.timings.settle_after_reset);
        self.bus.set_reset(false)?;
        self.delay.delay(self.timings.settle_after_reset);

        self.display_mode = DisplayMode::OFF;
        self.layout = MemoryLayout::default();
        Ok(())
    }

    fn display_mode(&mut self, mode: DisplayMode) -> GpioResult<()> {
        self.send_command(Command::DisplayMode.opcode())?;
        self.send_data(mode.to_mask())?;
        self.display_mode = mode;
        Ok(())
    }

    fn current_display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    fn set_backlight(&mut self, on: bool) -> GpioResult<()> {
        self.bus.set_backlight(on)
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, true)
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, false)
    }

    fn timings(&self) -> &Timings {
        &self.timings
    }

    fn wait(&self, duration: Duration) {
        self.delay.delay(duration);
    }

    fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    fn layout_mut(&mut self) -> &mut MemoryLayout {
        &mut self.layout
    }
}
