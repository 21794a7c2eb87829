mod app;
mod config;

use dotenv::dotenv;
use log::{debug, info};
use sysinfo::System;
use t6963_gpio::delay::ThreadDelay;
use t6963_gpio::gpiod::GpiodDriver;
use t6963_gpio::raw::RawGpioDriver;
use crate::config::{Backend, Config};

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!("Architecture {}", System::cpu_arch());

    let config = Config::from_env()?;
    let pins = &config.pins;

    info!("LCD @ WR: {}, C/D: {}, RST: {}, Data: {:?}, Backlight: {:?}",
        pins.wr, pins.cd, pins.reset, pins.data, pins.backlight);

    debug!("Initializing GPIO driver ({:?})...", config.backend);
    match &config.backend {
        Backend::GpioMem => {
            let gpio = RawGpioDriver::new_gpiomem()?;
            debug!("{:?} initialized.", gpio);
            app::run(&gpio, pins, ThreadDelay)?;
        }
        Backend::Mem => {
            let gpio = RawGpioDriver::new_mem()?;
            debug!("{:?} initialized.", gpio);
            app::run(&gpio, pins, ThreadDelay)?;
        }
        Backend::Chip(path) => {
            let gpio = GpiodDriver::open(path)?;
            debug!("{:?} initialized.", gpio);
            app::run(&gpio, pins, ThreadDelay)?;
        }
    }

    info!("Done.");

    Ok(())
}
