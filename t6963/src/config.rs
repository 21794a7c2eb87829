use std::path::PathBuf;
use eyre::eyre;
use t6963_gpio::lcd::t6963c::PinMap;

/// Where the GPIO lines come from.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum Backend {
    /// Register access through `/dev/gpiomem`.
    #[default]
    GpioMem,
    /// Register access through `/dev/mem`, needs root.
    Mem,
    /// Linux GPIO character device, e.g. `/dev/gpiochip0`.
    Chip(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub backend: Backend,
    pub pins: PinMap,
}

impl Config {
    /// Reads the configuration from the process environment. Unset variables keep their defaults.
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let mut config = Config::default();

        if let Some(backend) = lookup("T6963_GPIO") {
            config.backend = match backend.trim() {
                "gpiomem" => Backend::GpioMem,
                "mem" => Backend::Mem,
                path if path.starts_with('/') => Backend::Chip(PathBuf::from(path)),
                other => return Err(eyre!("Unknown GPIO backend {:?}", other)),
            };
        }

        if let Some(pin) = lookup("T6963_PIN_WR") {
            config.pins.wr = pin.trim().parse()?;
        }
        if let Some(pin) = lookup("T6963_PIN_CD") {
            config.pins.cd = pin.trim().parse()?;
        }
        if let Some(pin) = lookup("T6963_PIN_RESET") {
            config.pins.reset = pin.trim().parse()?;
        }
        if let Some(pins) = lookup("T6963_PINS_DATA") {
            config.pins.data = parse_pin_bus(&pins)?;
        }
        if let Some(pin) = lookup("T6963_PIN_BACKLIGHT") {
            config.pins.backlight = Some(pin.trim().parse()?);
        }

        config
            .pins
            .validate()
            .map_err(|_| eyre!("Pin map uses a GPIO line twice: {:?}", config.pins))?;

        Ok(config)
    }
}

fn parse_pin_bus<const N: usize>(pin_str: &str) -> eyre::Result<[usize; N]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre!("Expected {} data pins", N))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, Backend::GpioMem);
        assert_eq!(config.pins, PinMap::default());
    }

    #[test]
    fn pins_and_backend_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("T6963_GPIO", "/dev/gpiochip0"),
            ("T6963_PIN_WR", "2"),
            ("T6963_PIN_CD", " 3 "),
            ("T6963_PIN_RESET", "4"),
            ("T6963_PINS_DATA", "10, 11;12 13,14,15,16,17"),
            ("T6963_PIN_BACKLIGHT", "18"),
        ]))
        .unwrap();

        assert_eq!(config.backend, Backend::Chip(PathBuf::from("/dev/gpiochip0")));
        assert_eq!(
            config.pins,
            PinMap {
                data: [10, 11, 12, 13, 14, 15, 16, 17],
                wr: 2,
                cd: 3,
                reset: 4,
                backlight: Some(18),
            }
        );
    }

    #[test]
    fn wrong_number_of_data_pins_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("T6963_PINS_DATA", "1,2,3")])).is_err());
        assert!(Config::from_lookup(lookup(&[("T6963_PINS_DATA", "1,2,3,4,5,6,7,8,9")])).is_err());
        assert!(Config::from_lookup(lookup(&[("T6963_PINS_DATA", "1,2,3,4,5,6,7,x")])).is_err());
    }

    #[test]
    fn overlapping_pins_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("T6963_PIN_WR", "5")])).is_err());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("T6963_GPIO", "spi")])).is_err());
        let config = Config::from_lookup(lookup(&[("T6963_GPIO", "mem")])).unwrap();
        assert_eq!(config.backend, Backend::Mem);
    }
}
