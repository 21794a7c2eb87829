use crate::{has_duplicates, GpioError, GpioResult};

/// Assignment of controller signals to GPIO line indices.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PinMap {
    /// Data bus, D0 first.
    pub data: [usize; 8],
    /// Write strobe.
    pub wr: usize,
    /// Command/data select.
    pub cd: usize,
    pub reset: usize,
    pub backlight: Option<usize>,
}

impl PinMap {
    /// Checks that no line is used for two signals.
    pub fn validate(&self) -> GpioResult<()> {
        if has_duplicates(&self.lines()) {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    /// Gets every line of the map, data bus first.
    pub fn lines(&self) -> Vec<usize> {
        let mut lines = self.data.to_vec();
        lines.extend([self.wr, self.cd, self.reset]);
        lines.extend(self.backlight);
        lines
    }
}

impl Default for PinMap {
    /// BCM numbering of a Raspberry Pi header.
    fn default() -> Self {
        PinMap {
            data: [5, 6, 13, 19, 26, 16, 20, 21],
            wr: 17,
            cd: 27,
            reset: 22,
            backlight: None,
        }
    }
}
