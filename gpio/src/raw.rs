//! Raw GPIO backend for BCM283x chips, writing the GPIO registers directly through a memory map
//! of `/dev/gpiomem` (or `/dev/mem`).
use crate::{has_duplicates, GpioActiveLevel, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

const FUNCTION_INPUT: u32 = 0b000;
const FUNCTION_OUTPUT: u32 = 0b001;

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    const GPIO_BASE: u32 = 0x3F200000;

    const PIN_COUNT: usize = 58;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(offset)
            .len(4096)
            .map_raw(&file)?;

        debug!("Mapped GPIO registers from {}", path);

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    /// `/dev/gpiomem` already starts at the GPIO block, no root needed.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem", Self::GPIO_BASE as u64)
    }

    fn set_pin_function(&self, pin_index: usize, function: u32) {
        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPFSELn register
        let register_ptr = unsafe { mmap.add(pin_index / 10) };
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift);
        register_value |= function << shift;
        unsafe { register_ptr.write_volatile(register_value) };
    }

    fn set_pin_level(&self, pin_index: usize, high: bool) {
        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPSETn/GPCLRn register
        let register_ptr = unsafe { mmap.add(if high { 0x1c / 4 } else { 0x28 / 4 } + pin_index / 32) };
        let shift = pin_index % 32;

        unsafe { register_ptr.write_volatile(1 << shift) };
    }

    /// Drives the inactive level first, so the line never glitches to its active level when it
    /// turns into an output.
    fn claim(&self, index: usize, active_level: GpioActiveLevel) {
        self.used_pins.set_aliased(index, true);
        self.set_pin_level(index, active_level.get_state(false));
        self.set_pin_function(index, FUNCTION_OUTPUT);
        debug!("Claimed GPIO{} as output", index);
    }

    /// Returns the line to input mode, so a released line never keeps driving the display.
    fn release(&self, index: usize) {
        self.set_pin_function(index, FUNCTION_INPUT);
        self.used_pins.set_aliased(index, false);
        debug!("Released GPIO{}", index);
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> usize {
        Self::PIN_COUNT
    }

    fn output(
        &self,
        index: usize,
        active_level: GpioActiveLevel,
    ) -> GpioResult<Box<dyn GpioOutput + '_>> {
        if index >= self.count() {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.claim(index, active_level);

        Ok(Box::new(RawGpioOutput {
            driver: self,
            pin_index: index,
            active_level,
        }))
    }

    fn output_bus<const N: usize>(
        &self,
        indices: [usize; N],
        active_level: GpioActiveLevel,
    ) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        let n = self.count();

        if indices.iter().any(|&index| index >= n) || has_duplicates(&indices) {
            return Err(GpioError::InvalidArgument);
        }

        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in &indices {
            self.claim(index, active_level);
        }

        Ok(Box::new(RawGpioBusOutput {
            driver: self,
            pin_indices: indices,
            active_level,
        }))
    }
}

struct RawGpioOutput<'a> {
    driver: &'a RawGpioDriver,
    pin_index: usize,
    active_level: GpioActiveLevel,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.pin_index)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.set_pin_level(self.pin_index, self.active_level.get_state(value));
        Ok(())
    }
}

impl Drop for RawGpioOutput<'_> {
    fn drop(&mut self) {
        self.driver.release(self.pin_index);
    }
}

struct RawGpioBusOutput<'a, const N: usize> {
    driver: &'a RawGpioDriver,
    pin_indices: [usize; N],
    active_level: GpioActiveLevel,
}

impl<const N: usize> Debug for RawGpioBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}[output]", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBusOutput<N> for RawGpioBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (&pin_index, &value) in self.pin_indices.iter().zip(values) {
            self.driver.set_pin_level(pin_index, self.active_level.get_state(value));
        }
        Ok(())
    }
}

impl<const N: usize> Drop for RawGpioBusOutput<'_, N> {
    fn drop(&mut self) {
        for &pin_index in &self.pin_indices {
            self.driver.release(pin_index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPFSEL1: usize = 1;
    const GPSET0: usize = 0x1c / 4;
    const GPCLR0: usize = 0x28 / 4;

    fn anonymous() -> RawGpioDriver {
        let mmap = MmapOptions::new().len(4096).map_anon().unwrap();
        RawGpioDriver {
            mmap: MmapRaw::from(mmap),
            used_pins: BitVec::repeat(false, RawGpioDriver::PIN_COUNT),
        }
    }

    fn register(gpio: &RawGpioDriver, index: usize) -> u32 {
        unsafe { (gpio.mmap.as_ptr() as *const u32).add(index).read_volatile() }
    }

    #[test]
    fn claim_drives_inactive_level_and_switches_to_output() {
        let gpio = anonymous();

        let strobe = gpio.output(17, GpioActiveLevel::Low).unwrap();
        assert_eq!(register(&gpio, GPSET0), 1 << 17);
        assert_eq!((register(&gpio, GPFSEL1) >> 21) & 0b111, FUNCTION_OUTPUT);

        let _data = gpio.output_bus([12, 13], GpioActiveLevel::High).unwrap();
        assert_eq!(register(&gpio, GPCLR0), 1 << 13);

        drop(strobe);
        assert_eq!((register(&gpio, GPFSEL1) >> 21) & 0b111, FUNCTION_INPUT);
    }

    #[test]
    fn claimed_line_is_busy_until_dropped() {
        let gpio = anonymous();

        let line = gpio.output(4, GpioActiveLevel::High).unwrap();
        assert_eq!(gpio.output(4, GpioActiveLevel::High).unwrap_err(), GpioError::AlreadyInUse);
        drop(line);
        assert!(gpio.output(4, GpioActiveLevel::High).is_ok());
    }
}
