/// Instruction set of the T6963C controller.
///
/// Commands taking operands are sent as the opcode followed by the operand bytes, low byte first.
/// Some commands carry their argument in the low bits of the opcode itself, see
/// [Command::with_bits].
///
/// The read commands are listed for completeness; this driver has no way to read the bus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Command {
    /// Operands: column, row.
    SetCursorPointer = 0x21,
    /// Operands: character generator offset, low byte first.
    SetOffsetRegister = 0x22,
    /// Operands: address, low byte first.
    SetAddressPointer = 0x24,
    SetTextHomeAddress = 0x40,
    SetTextArea = 0x41,
    SetGraphicHomeAddress = 0x42,
    SetGraphicArea = 0x43,
    /// Low bits: [ModeSet] mask and external character generator bit.
    ModeSet = 0x80,
    /// Operand: [DisplayMode] mask.
    DisplayMode = 0x90,
    /// Low bits: cursor height in lines, minus one.
    CursorPattern = 0xA0,
    SetDataAutoWrite = 0xB0,
    SetDataAutoRead = 0xB1,
    AutoReset = 0xB2,
    DataWriteIncrement = 0xC0,
    DataReadIncrement = 0xC1,
    DataWriteDecrement = 0xC2,
    DataReadDecrement = 0xC3,
    DataWriteNonVariable = 0xC4,
    DataReadNonVariable = 0xC5,
    ScreenPeek = 0xE0,
    ScreenCopy = 0xE8,
    /// Low bits: bit index 0-7.
    BitReset = 0xF0,
    /// Low bits: bit index 0-7.
    BitSet = 0xF8,
}

impl Command {
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Combines the opcode with argument bits carried in the opcode itself.
    pub fn with_bits(self, bits: u8) -> u8 {
        self as u8 | bits
    }
}

/// Layers and cursor settings of the display mode command.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DisplayMode {
    pub cursor_blink: bool,
    pub cursor_on: bool,
    pub text_on: bool,
    pub graphic_on: bool,
}

impl DisplayMode {
    /// Everything off, the display is blank.
    pub const OFF: Self = DisplayMode {
        cursor_blink: false,
        cursor_on: false,
        text_on: false,
        graphic_on: false,
    };

    /// Set up by the init sequence: both layers and the cursor on, no blinking (`0x0E`).
    pub const INIT: Self = DisplayMode {
        cursor_blink: false,
        cursor_on: true,
        text_on: true,
        graphic_on: true,
    };

    pub fn to_mask(&self) -> u8 {
        let mut mask = 0;
        if self.cursor_blink {
            mask |= 0b0001;
        }
        if self.cursor_on {
            mask |= 0b0010;
        }
        if self.text_on {
            mask |= 0b0100;
        }
        if self.graphic_on {
            mask |= 0b1000;
        }
        mask
    }
}

/// How the text and graphic layers are combined.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ModeSet {
    #[default]
    Or,
    ExclusiveOr,
    And,
    /// Graphic area holds attributes for the text layer instead of pixels.
    TextAttribute,
}

impl ModeSet {
    pub fn to_mask(&self) -> u8 {
        match self {
            ModeSet::Or => 0b0000,
            ModeSet::ExclusiveOr => 0b0001,
            ModeSet::And => 0b0011,
            ModeSet::TextAttribute => 0b0100,
        }
    }
}

/// Set together with [ModeSet] to use an external character generator ROM.
pub const EXTERNAL_CG_MASK: u8 = 0b1000;
