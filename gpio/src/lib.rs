//! GPIO output abstraction and the T6963C LCD driver built on top of it.
//!
//! A [GpioDriver] hands out claimed output lines ([GpioOutput]) and output buses
//! ([GpioBusOutput]). A line stays claimed for as long as its handle lives; dropping the handle
//! releases it back to the backend, which is what makes pin cleanup happen on every exit path.
pub mod delay;
pub mod gpiod;
pub mod lcd;
pub mod mock;
pub mod raw;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported by this setup")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO lines available.
    fn count(&self) -> usize;

    /// Claims the GPIO line at the given index and configures it as an output.
    ///
    /// The line is released when the returned handle is dropped.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the line is already claimed.
    fn output(
        &self,
        index: usize,
        active_level: GpioActiveLevel,
    ) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Claims the GPIO lines at the given indices as a single output bus.
    ///
    /// Either all lines get claimed or none of them do.
    fn output_bus<const N: usize>(
        &self,
        indices: [usize; N],
        active_level: GpioActiveLevel,
    ) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;
}

/// Specifies the active level of the GPIO line.
///
/// By default, the active level is high. With [GpioActiveLevel::Low], writing `true` drives the
/// line low, which lets drivers talk about asserting a strobe rather than about voltages.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

impl GpioActiveLevel {
    /// Gets the real state that will be outputted on the GPIO line based on the active level and the value.
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }
}

pub trait GpioOutput: Debug {
    /// Writes the logical state of the GPIO line.
    fn write(&self, value: bool) -> GpioResult<()>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    /// Writes the values to the lines of the bus, in the order the lines were claimed.
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl dyn GpioBusOutput<8> + '_ {
    /// Writes the values to the GPIO lines in the bus.
    /// The values are written as a byte, LSb first.
    pub fn write_byte(&self, value: u8) -> GpioResult<()> {
        let mut values = [false; 8];
        for (i, bit) in values.iter_mut().enumerate() {
            *bit = (value & (1 << i)) != 0;
        }
        self.write(&values)
    }
}

/// Checks that no index shows up twice, used by backends before claiming a bus.
pub(crate) fn has_duplicates(indices: &[usize]) -> bool {
    indices
        .iter()
        .enumerate()
        .any(|(i, index)| indices[..i].contains(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_low_inverts() {
        assert!(GpioActiveLevel::High.get_state(true));
        assert!(!GpioActiveLevel::Low.get_state(true));
        assert!(GpioActiveLevel::Low.get_state(false));
    }

    #[test]
    fn io_error_keeps_kind() {
        let err: GpioError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert_eq!(err, GpioError::Io(std::io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn duplicate_indices_are_detected() {
        assert!(!has_duplicates(&[1, 2, 3]));
        assert!(has_duplicates(&[1, 2, 1]));
        assert!(!has_duplicates(&[]));
    }
}
