//! T6963C LCD driver module.
//!
//! See [T6963CDriver] for the driver interface and [GpioT6963CDriver] for the implementation using
//! GPIO lines.

mod gpio;

use crate::lcd::t6963c::{Command, DisplayMode, ModeSet, EXTERNAL_CG_MASK};
use crate::{GpioError, GpioResult};
use log::{debug, warn};
use std::fmt::Debug;
use std::time::Duration;
pub use gpio::*;

/// Start of the text area in the controller memory.
pub const TEXT_HOME_ADDRESS: u16 = 0x0000;
/// Start of the graphic area in the controller memory.
pub const GRAPHIC_HOME_ADDRESS: u16 = 0x1000;
/// Bytes per row of the text area, one per character cell.
pub const TEXT_AREA_COLUMNS: u16 = 0x0010;
/// Bytes per row of the graphic area.
pub const GRAPHIC_AREA_COLUMNS: u16 = 0x0010;
pub const TEXT_ROWS: u16 = 16;
/// Pixel rows of the graphic area, eight per text row.
pub const GRAPHIC_ROWS: u16 = TEXT_ROWS * 8;
/// Start of the character generator RAM in the controller memory.
pub const CG_HOME_ADDRESS: u16 = 0x7800;
/// Size of the character generator RAM.
pub const CG_RAM_BYTES: usize = 2048;
/// The character generator RAM must start on a 2 KiB boundary.
const CG_ADDRESS_MASK: u16 = 0xF800;
/// Codes from here on come from the character generator RAM.
pub const CUSTOM_CHAR_CODE: u16 = 0x80;
/// Number of custom characters the character generator RAM holds.
pub const CUSTOM_CHARS: usize = 128;
/// Number of character cells overwritten by [T6963CDriver::clear_screen].
pub const TEXT_CELLS: usize = (TEXT_AREA_COLUMNS * TEXT_ROWS) as usize;
/// Cursor height set up by the init sequence.
pub const CURSOR_LINES: u8 = 2;
/// The built-in font starts at the space character.
pub const FONT_OFFSET: u32 = 0x20;

/// Fixed delays the controller needs between transactions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timings {
    /// After every byte on the bus.
    pub settle_after_byte: Duration,
    /// Both while the reset line is held and after releasing it.
    pub settle_after_reset: Duration,
    /// After each command group of the init sequence.
    pub settle_after_init_group: Duration,
    /// After moving the cursor.
    pub settle_after_cursor: Duration,
    /// After each character written to the text area.
    pub settle_after_char: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            settle_after_byte: Duration::from_millis(1),
            settle_after_reset: Duration::from_millis(100),
            settle_after_init_group: Duration::from_millis(50),
            settle_after_cursor: Duration::from_millis(10),
            settle_after_char: Duration::from_millis(10),
        }
    }
}

/// Where the text, graphic and character generator areas live, as last programmed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemoryLayout {
    pub text_home: u16,
    pub text_columns: u16,
    pub graphic_home: u16,
    pub graphic_columns: u16,
    pub cg_home: u16,
}

impl MemoryLayout {
    /// Bytes of the text area, one per character cell.
    pub fn text_bytes(&self) -> usize {
        self.text_columns as usize * TEXT_ROWS as usize
    }

    /// Bytes of the graphic area.
    pub fn graphic_bytes(&self) -> usize {
        self.graphic_columns as usize * GRAPHIC_ROWS as usize
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        MemoryLayout {
            text_home: TEXT_HOME_ADDRESS,
            text_columns: TEXT_AREA_COLUMNS,
            graphic_home: GRAPHIC_HOME_ADDRESS,
            graphic_columns: GRAPHIC_AREA_COLUMNS,
            cg_home: CG_HOME_ADDRESS,
        }
    }
}

/// Maps a character to its code in the built-in font.
///
/// Characters outside the font table are not rejected, the code just wraps.
pub fn char_code(c: char) -> u8 {
    (c as u32).wrapping_sub(FONT_OFFSET) as u8
}

/// The `T6963CDriver` trait defines the operations of a T6963C controller.
///
/// Implementations provide the bus access (the low-level commands at the bottom of the trait),
/// everything else is built on top of them.
///
/// # Framing
///
/// Every command is sent as the opcode byte first, followed by its operand bytes (low byte first
/// for 16-bit operands). Every byte is followed by the settle delay from [Timings], so there is no
/// status polling.
///
/// # State
///
/// After power-up the controller is in an unknown state. [T6963CDriver::reset] followed by
/// [T6963CDriver::init] brings it into a known configuration. Other operations before that are not
/// guarded and the outcome is up to the controller.
///
/// The driver remembers the [MemoryLayout] it programmed, so the operations that move the address
/// pointer to an area follow the area when it is moved.
///
/// Coordinates and characters are passed through unchecked.
pub trait T6963CDriver: Debug {
    /// Programs the memory layout and display mode, in this order:
    /// 1. text home address `0x0000`,
    /// 2. text area of 16 columns,
    /// 3. graphic home address `0x1000`,
    /// 4. graphic area of 16 columns,
    /// 5. display mode `0x0E`: text and graphic layers on, cursor shown without blinking,
    /// 6. 2-line cursor pattern.
    ///
    /// The first five groups are followed by the init group settle delay.
    /// Must be called right after [T6963CDriver::reset].
    fn init(&mut self) -> GpioResult<()> {
        debug!("Initializing T6963C");

        let settle = self.timings().settle_after_init_group;
        let layout = MemoryLayout::default();
        *self.layout_mut() = layout;

        self.set_text_home_address(layout.text_home)?;
        self.wait(settle);
        self.set_text_area(layout.text_columns)?;
        self.wait(settle);
        self.set_graphic_home_address(layout.graphic_home)?;
        self.wait(settle);
        self.set_graphic_area(layout.graphic_columns)?;
        self.wait(settle);
        self.display_mode(DisplayMode::INIT)?;
        self.wait(settle);
        self.cursor_pattern(CURSOR_LINES)?;
        Ok(())
    }

    /// Sends the command followed by a 16-bit operand, low byte first.
    fn send_command_with_word(&mut self, command: Command, word: u16) -> GpioResult<()> {
        let [low, high] = word.to_le_bytes();
        self.send_command(command.opcode())?;
        self.send_data(low)?;
        self.send_data(high)
    }

    fn set_text_home_address(&mut self, address: u16) -> GpioResult<()> {
        self.send_command_with_word(Command::SetTextHomeAddress, address)?;
        self.layout_mut().text_home = address;
        Ok(())
    }

    fn set_text_area(&mut self, columns: u16) -> GpioResult<()> {
        self.send_command_with_word(Command::SetTextArea, columns)?;
        self.layout_mut().text_columns = columns;
        Ok(())
    }

    fn set_graphic_home_address(&mut self, address: u16) -> GpioResult<()> {
        self.send_command_with_word(Command::SetGraphicHomeAddress, address)?;
        self.layout_mut().graphic_home = address;
        Ok(())
    }

    fn set_graphic_area(&mut self, columns: u16) -> GpioResult<()> {
        self.send_command_with_word(Command::SetGraphicArea, columns)?;
        self.layout_mut().graphic_columns = columns;
        Ok(())
    }

    /// Moves the cursor to column `x`, row `y`.
    ///
    /// The address sent is `x + y * 256`, wrapping at 16 bits.
    fn set_cursor(&mut self, x: u16, y: u16) -> GpioResult<()> {
        let address = x.wrapping_add(y.wrapping_mul(256));
        self.send_command_with_word(Command::SetCursorPointer, address)?;
        self.wait(self.timings().settle_after_cursor);
        Ok(())
    }

    /// Writes the text character by character. The controller advances its write position itself.
    fn write_text(&mut self, text: &str) -> GpioResult<()> {
        for c in text.chars() {
            if !(' '..='\u{ff}').contains(&c) {
                warn!("Character {:?} is outside of the font table", c);
            }
            self.send_data(char_code(c))?;
            self.wait(self.timings().settle_after_char);
        }
        Ok(())
    }

    /// Moves the cursor home and overwrites every text cell with a blank.
    fn clear_screen(&mut self) -> GpioResult<()> {
        self.set_cursor(0, 0)?;
        for _ in 0..TEXT_CELLS {
            self.send_data(0)?;
            self.wait(self.timings().settle_after_char);
        }
        Ok(())
    }

    /// Turns the text and graphic layers on or off, keeping the cursor settings.
    fn set_layers(&mut self, text: bool, graphic: bool) -> GpioResult<()> {
        let mode = DisplayMode {
            text_on: text,
            graphic_on: graphic,
            ..self.current_display_mode()
        };
        self.display_mode(mode)
    }

    fn set_cursor_visible(&mut self, visible: bool) -> GpioResult<()> {
        let mode = DisplayMode {
            cursor_on: visible,
            ..self.current_display_mode()
        };
        self.display_mode(mode)
    }

    fn set_cursor_blink(&mut self, blink: bool) -> GpioResult<()> {
        let mode = DisplayMode {
            cursor_blink: blink,
            ..self.current_display_mode()
        };
        self.display_mode(mode)
    }

    /// Sets the cursor height, from 1 to 8 lines.
    fn cursor_pattern(&mut self, lines: u8) -> GpioResult<()> {
        if !(1..=8).contains(&lines) {
            return Err(GpioError::InvalidArgument);
        }
        self.send_command(Command::CursorPattern.with_bits(lines - 1))
    }

    /// Sets how the text and graphic layers are combined.
    fn mode_set(&mut self, mode: ModeSet, external_cg: bool) -> GpioResult<()> {
        let mut bits = mode.to_mask();
        if external_cg {
            bits |= EXTERNAL_CG_MASK;
        }
        self.send_command(Command::ModeSet.with_bits(bits))
    }

    /// Sets the address used by the data write commands.
    fn set_address_pointer(&mut self, address: u16) -> GpioResult<()> {
        self.send_command_with_word(Command::SetAddressPointer, address)
    }

    /// Sets the offset register, which holds the upper five bits of the character generator RAM
    /// address.
    fn set_offset_register(&mut self, offset: u16) -> GpioResult<()> {
        self.send_command_with_word(Command::SetOffsetRegister, offset)?;
        self.layout_mut().cg_home = offset << 11;
        Ok(())
    }

    /// Moves the character generator RAM. Addresses off the 2 KiB grid are rounded down.
    fn set_cg_home_address(&mut self, address: u16) -> GpioResult<()> {
        let aligned = address & CG_ADDRESS_MASK;
        if aligned != address {
            warn!("CG RAM address {:#06x} rounded down to {:#06x}", address, aligned);
        }
        self.set_offset_register(aligned >> 11)
    }

    /// Points the address pointer at the start of the text area and returns that address.
    fn text_home(&mut self) -> GpioResult<u16> {
        let address = self.layout().text_home;
        self.set_address_pointer(address)?;
        Ok(address)
    }

    /// Points the address pointer at the start of the graphic area and returns that address.
    fn graphic_home(&mut self) -> GpioResult<u16> {
        let address = self.layout().graphic_home;
        self.set_address_pointer(address)?;
        Ok(address)
    }

    /// Points the address pointer at the start of the character generator RAM and returns that
    /// address.
    fn cg_home(&mut self) -> GpioResult<u16> {
        let address = self.layout().cg_home;
        self.set_address_pointer(address)?;
        Ok(address)
    }

    /// Writes a byte at the address pointer, then increments the pointer.
    fn write_increment(&mut self, data: u8) -> GpioResult<()> {
        self.send_command(Command::DataWriteIncrement.opcode())?;
        self.send_data(data)
    }

    /// Writes a byte at the address pointer, then decrements the pointer.
    fn write_decrement(&mut self, data: u8) -> GpioResult<()> {
        self.send_command(Command::DataWriteDecrement.opcode())?;
        self.send_data(data)
    }

    /// Writes a byte at the address pointer, leaving the pointer as is.
    fn write_non_variable(&mut self, data: u8) -> GpioResult<()> {
        self.send_command(Command::DataWriteNonVariable.opcode())?;
        self.send_data(data)
    }

    /// Writes a block of bytes starting at the address pointer using auto write mode.
    fn auto_write(&mut self, data: &[u8]) -> GpioResult<()> {
        self.send_command(Command::SetDataAutoWrite.opcode())?;
        for &byte in data {
            self.send_data(byte)?;
        }
        self.send_command(Command::AutoReset.opcode())
    }

    /// Writes `count` copies of `value` starting at the address pointer using auto write mode.
    fn auto_fill(&mut self, value: u8, count: usize) -> GpioResult<()> {
        self.send_command(Command::SetDataAutoWrite.opcode())?;
        for _ in 0..count {
            self.send_data(value)?;
        }
        self.send_command(Command::AutoReset.opcode())
    }

    /// Uploads custom 8x8 characters, one byte per row from the top, to the character generator
    /// RAM. The first one gets the code `0x80 + location`.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the characters would run past the last custom code.
    fn define_chars(&mut self, chars: &[[u8; 8]], location: u8) -> GpioResult<()> {
        if location as usize + chars.len() > CUSTOM_CHARS {
            return Err(GpioError::InvalidArgument);
        }

        let address = self
            .layout()
            .cg_home
            .wrapping_add(CUSTOM_CHAR_CODE * 8)
            .wrapping_add(location as u16 * 8);
        self.set_address_pointer(address)?;
        self.auto_write(chars.as_flattened())
    }

    /// Zeroes the graphic area, the text area and the character generator RAM, sized from the
    /// current [MemoryLayout].
    fn clear_all(&mut self) -> GpioResult<()> {
        let layout = *self.layout();
        debug!("Clearing all display memory: {:?}", layout);

        self.graphic_home()?;
        self.auto_fill(0, layout.graphic_bytes())?;
        self.text_home()?;
        self.auto_fill(0, layout.text_bytes())?;
        self.cg_home()?;
        self.auto_fill(0, CG_RAM_BYTES)
    }

    /// Sets a bit of the byte at the address pointer.
    fn bit_set(&mut self, bit: u8) -> GpioResult<()> {
        if bit > 7 {
            return Err(GpioError::InvalidArgument);
        }
        self.send_command(Command::BitSet.with_bits(bit))
    }

    /// Clears a bit of the byte at the address pointer.
    fn bit_reset(&mut self, bit: u8) -> GpioResult<()> {
        if bit > 7 {
            return Err(GpioError::InvalidArgument);
        }
        self.send_command(Command::BitReset.with_bits(bit))
    }

    /// Copies the displayed raster line at the address pointer into the graphic area.
    fn screen_copy(&mut self) -> GpioResult<()> {
        self.send_command(Command::ScreenCopy.opcode())
    }

    // Low-level commands
    // Implemented by the driver implementation, the operations above are built from these.

    /// Pulses the reset line: held for the reset settle time, then released and given the same
    /// time again.
    fn reset(&mut self) -> GpioResult<()>;

    /// Sends the display mode command with the mode byte, and remembers the mode.
    fn display_mode(&mut self, mode: DisplayMode) -> GpioResult<()>;

    /// Gets the last display mode sent.
    fn current_display_mode(&self) -> DisplayMode;

    /// Switches the backlight.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if there is no backlight line.
    fn set_backlight(&mut self, on: bool) -> GpioResult<()>;

    /// Sends a command byte (C/D high).
    fn send_command(&mut self, command: u8) -> GpioResult<()>;

    /// Sends a data byte (C/D low).
    fn send_data(&mut self, data: u8) -> GpioResult<()>;

    fn timings(&self) -> &Timings;

    /// Gets the memory layout programmed so far.
    fn layout(&self) -> &MemoryLayout;

    fn layout_mut(&mut self) -> &mut MemoryLayout;

    /// Blocks for the given time.
    fn wait(&self, duration: Duration);
}
