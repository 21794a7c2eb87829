use std::time::Duration;
use log::info;
use t6963_gpio::delay::Delay;
use t6963_gpio::lcd::t6963c::driver::{BusHandle, GpioT6963CDriver, T6963CDriver};
use t6963_gpio::lcd::t6963c::{DisplayMode, PinMap};
use t6963_gpio::{GpioDriver, GpioResult};

pub const GREETING: &str = "Hello, T6963C!";

/// How long the display stays off during the display mode check.
pub const DISPLAY_TEST_PAUSE: Duration = Duration::from_secs(2);

/// Claims the LCD lines, shows the greeting and releases the lines again.
///
/// The lines are released when the driver goes out of scope, also when a step fails halfway.
pub fn run<'a, D: GpioDriver>(gpio: &'a D, pins: &PinMap, delay: impl Delay + 'a) -> GpioResult<()> {
    let bus = BusHandle::claim(gpio, pins)?;
    let mut lcd = GpioT6963CDriver::new(bus, delay);
    show_greeting(&mut lcd)
}

pub fn show_greeting(lcd: &mut dyn T6963CDriver) -> GpioResult<()> {
    info!("Resetting display...");
    lcd.reset()?;

    info!("Initializing display...");
    lcd.init()?;

    info!("Checking display mode: off for {:?}...", DISPLAY_TEST_PAUSE);
    lcd.display_mode(DisplayMode::OFF)?;
    lcd.wait(DISPLAY_TEST_PAUSE);
    lcd.display_mode(DisplayMode::INIT)?;

    info!("Clearing screen...");
    lcd.clear_screen()?;

    info!("Writing {:?}...", GREETING);
    lcd.set_cursor(0, 0)?;
    lcd.write_text(GREETING)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use t6963_gpio::GpioError;
    use t6963_gpio::lcd::t6963c::driver::{char_code, TEXT_CELLS};
    use t6963_gpio::mock::{MockEvent, MockGpioDriver};

    fn latched(gpio: &MockGpioDriver, pins: &PinMap) -> Vec<(bool, u8)> {
        gpio.latched_bytes(pins.wr, pins.cd, pins.data)
            .into_iter()
            .map(|byte| (byte.select, byte.value))
            .collect()
    }

    #[test]
    fn greeting_ends_the_trace() {
        let gpio = MockGpioDriver::new(28);
        let pins = PinMap::default();
        run(&gpio, &pins, gpio.delay()).unwrap();

        let sent = latched(&gpio, &pins);
        let greeting: Vec<_> = GREETING.chars().map(|c| (false, char_code(c))).collect();
        assert_eq!(sent[sent.len() - greeting.len()..], greeting[..]);
        assert_eq!(
            sent.len(),
            15 + 4 + 3 + TEXT_CELLS + 3 + GREETING.len()
        );

        // Display off, then back on with the init mode, right after the init sequence.
        assert_eq!(sent[15..19], [(true, 0x90), (false, 0x00), (true, 0x90), (false, 0x0E)]);
    }

    #[test]
    fn display_stays_off_for_the_pause() {
        let gpio = MockGpioDriver::new(28);
        run(&gpio, &PinMap::default(), gpio.delay()).unwrap();
        assert!(gpio.events().contains(&MockEvent::Delay(DISPLAY_TEST_PAUSE)));
    }

    #[test]
    fn lines_are_released_after_success() {
        let gpio = MockGpioDriver::new(28);
        let pins = PinMap::default();
        run(&gpio, &pins, gpio.delay()).unwrap();

        for pin in pins.lines() {
            assert_eq!(gpio.release_count(pin), 1, "GPIO{}", pin);
        }
    }

    #[test]
    fn lines_are_released_once_after_fault_while_writing_text() {
        let gpio = MockGpioDriver::new(28);
        let pins = PinMap::default();

        // Init, display check, clear and cursor move.
        let bytes_before_greeting = 15 + 4 + 3 + TEXT_CELLS + 3;
        // Two idle levels on claim, two reset edges, then four writes per byte. The first
        // character of the greeting still goes through.
        gpio.fail_after(2 + 2 + (bytes_before_greeting + 1) * 4);

        let result = run(&gpio, &pins, gpio.delay());
        assert!(matches!(result, Err(GpioError::Other(_))));

        let sent = latched(&gpio, &pins);
        assert_eq!(sent.last(), Some(&(false, char_code('H'))));

        for pin in pins.lines() {
            assert_eq!(gpio.release_count(pin), 1, "GPIO{}", pin);
            assert!(!gpio.is_claimed(pin));
        }
    }

    #[test]
    fn busy_line_aborts_before_touching_the_display() {
        let gpio = MockGpioDriver::new(28);
        let pins = PinMap::default();
        let _busy = gpio.output(pins.cd, Default::default()).unwrap();

        assert_eq!(run(&gpio, &pins, gpio.delay()), Err(GpioError::AlreadyInUse));
        assert!(latched(&gpio, &pins).is_empty());
        assert!(!gpio.is_claimed(pins.wr));
    }
}
