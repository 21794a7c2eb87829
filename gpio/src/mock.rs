//! In-memory GPIO backend recording every electrical change.
//!
//! [MockGpioDriver] keeps an ordered log of [MockEvent]s: claims, the physical level written to
//! each line (after active level translation), delays issued through [MockDelay] and releases.
//! It can also be told to fail after a number of writes, to exercise error paths.
use crate::delay::Delay;
use crate::{has_duplicates, GpioActiveLevel, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;
use std::time::Duration;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MockEvent {
    Claim(usize),
    /// Physical level written to a line.
    Write { pin: usize, high: bool },
    Delay(Duration),
    Release(usize),
}

/// A byte sampled from the data lines on a rising edge of the strobe line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LatchedByte {
    /// Level of the select line at the time of the edge.
    pub select: bool,
    pub value: u8,
}

pub struct MockGpioDriver {
    count: usize,
    used_pins: BitVec<AtomicU8>,
    events: RefCell<Vec<MockEvent>>,
    writes_until_fault: Cell<Option<usize>>,
}

impl MockGpioDriver {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            used_pins: BitVec::repeat(false, count),
            events: RefCell::new(Vec::new()),
            writes_until_fault: Cell::new(None),
        }
    }

    /// Makes every write after the next `writes` successful ones fail.
    ///
    /// A bus write counts as a single write.
    pub fn fail_after(&self, writes: usize) {
        self.writes_until_fault.set(Some(writes));
    }

    /// Gets a delay that records into this driver's event log instead of sleeping.
    pub fn delay(&self) -> MockDelay<'_> {
        MockDelay { driver: self }
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn is_claimed(&self, pin: usize) -> bool {
        self.used_pins.get(pin).is_some_and(|bit| *bit)
    }

    /// Counts how many times the line was released.
    pub fn release_count(&self, pin: usize) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|&&event| event == MockEvent::Release(pin))
            .count()
    }

    /// Gets the last physical level written to the line, if any.
    pub fn level(&self, pin: usize) -> Option<bool> {
        self.events.borrow().iter().rev().find_map(|event| match *event {
            MockEvent::Write { pin: p, high } if p == pin => Some(high),
            _ => None,
        })
    }

    /// Gets the total time spent in delays.
    pub fn total_delay(&self) -> Duration {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                MockEvent::Delay(duration) => Some(*duration),
                _ => None,
            })
            .sum()
    }

    /// Replays the log like a parallel bus receiver would: on every low-to-high transition of
    /// `strobe`, samples the `select` line and the `data` lines (LSb first).
    ///
    /// Lines that were never written read as low.
    pub fn latched_bytes(&self, strobe: usize, select: usize, data: [usize; 8]) -> Vec<LatchedByte> {
        let mut levels = vec![false; self.count];
        let mut strobe_level = None;
        let mut latched = Vec::new();

        for event in self.events.borrow().iter() {
            let MockEvent::Write { pin, high } = *event else {
                continue;
            };

            if pin == strobe {
                if high && strobe_level == Some(false) {
                    let mut value = 0u8;
                    for (i, &data_pin) in data.iter().enumerate() {
                        if levels[data_pin] {
                            value |= 1 << i;
                        }
                    }
                    latched.push(LatchedByte {
                        select: levels[select],
                        value,
                    });
                }
                strobe_level = Some(high);
            }

            levels[pin] = high;
        }

        latched
    }

    fn push(&self, event: MockEvent) {
        self.events.borrow_mut().push(event);
    }

    fn check_fault(&self) -> GpioResult<()> {
        match self.writes_until_fault.get() {
            Some(0) => Err(GpioError::Other("injected fault".to_string())),
            Some(n) => {
                self.writes_until_fault.set(Some(n - 1));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn claim(&self, index: usize) {
        self.used_pins.set_aliased(index, true);
        self.push(MockEvent::Claim(index));
    }

    fn release(&self, index: usize) {
        self.used_pins.set_aliased(index, false);
        self.push(MockEvent::Release(index));
    }
}

impl Debug for MockGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockGpioDriver({})", self.count)
    }
}

impl GpioDriver for MockGpioDriver {
    fn count(&self) -> usize {
        self.count
    }

    fn output(
        &self,
        index: usize,
        active_level: GpioActiveLevel,
    ) -> GpioResult<Box<dyn GpioOutput + '_>> {
        if index >= self.count {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.claim(index);

        Ok(Box::new(MockOutput {
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
        if indices.iter().any(|&index| index >= self.count) || has_duplicates(&indices) {
            return Err(GpioError::InvalidArgument);
        }

        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in &indices {
            self.claim(index);
        }

        Ok(Box::new(MockBusOutput {
            driver: self,
            pin_indices: indices,
            active_level,
        }))
    }
}

struct MockOutput<'a> {
    driver: &'a MockGpioDriver,
    pin_index: usize,
    active_level: GpioActiveLevel,
}

impl Debug for MockOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.pin_index)
    }
}

impl GpioOutput for MockOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.check_fault()?;
        self.driver.push(MockEvent::Write {
            pin: self.pin_index,
            high: self.active_level.get_state(value),
        });
        Ok(())
    }
}

impl Drop for MockOutput<'_> {
    fn drop(&mut self) {
        self.driver.release(self.pin_index);
    }
}

struct MockBusOutput<'a, const N: usize> {
    driver: &'a MockGpioDriver,
    pin_indices: [usize; N],
    active_level: GpioActiveLevel,
}

impl<const N: usize> Debug for MockBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}[output]", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBusOutput<N> for MockBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.driver.check_fault()?;
        for (&pin, &value) in self.pin_indices.iter().zip(values) {
            self.driver.push(MockEvent::Write {
                pin,
                high: self.active_level.get_state(value),
            });
        }
        Ok(())
    }
}

impl<const N: usize> Drop for MockBusOutput<'_, N> {
    fn drop(&mut self) {
        for &pin_index in &self.pin_indices {
            self.driver.release(pin_index);
        }
    }
}

/// Delay that records [MockEvent::Delay] instead of sleeping.
pub struct MockDelay<'a> {
    driver: &'a MockGpioDriver,
}

impl Debug for MockDelay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[delay]", self.driver)
    }
}

impl Delay for MockDelay<'_> {
    fn delay(&self, duration: Duration) {
        self.driver.push(MockEvent::Delay(duration));
    }
}
