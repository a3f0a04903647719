use spi_shift_gpio::{
    attach, BankConfig, BusError, DeviceDescription, LineTable, Result, SelfTest,
    TransferParams, Transport,
};
use std::{thread, time::Duration};

// Stands in for a real SPI device: prints each byte as an 8-LED bar.
struct ConsoleBus;

impl Transport for ConsoleBus {
    fn configure(&mut self, params: &TransferParams) -> std::result::Result<(), BusError> {
        println!("Bus configured: {} bits per word", params.bits_per_word);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> std::result::Result<(), BusError> {
        for byte in bytes {
            let leds: String = (0..8)
                .rev()
                .map(|bit| if byte & (1 << bit) != 0 { '#' } else { '.' })
                .collect();
            println!("0x{:02X} [{}]", byte, leds);
        }
        Ok(())
    }

    fn release(&mut self) {
        println!("Bus released.");
    }
}

// External line number of output Q0
const BASE_LINE: u32 = 12;

fn main() -> Result<()> {
    env_logger::init();

    let config = BankConfig {
        self_test: Some(SelfTest {
            pattern: 0x55,
            hold: Duration::from_millis(300),
        }),
        ..BankConfig::default()
    };
    let mut table = LineTable::new();
    println!("Attaching bank at line {} (runs self-test)...", BASE_LINE);
    let bank = attach(&DeviceDescription::new(BASE_LINE), ConsoleBus, &mut table, &config)?;

    println!("Walking a single lit output across the bank...");
    for offset in 0..8 {
        bank.set_line(offset, true)?;
        thread::sleep(Duration::from_millis(150));
        bank.set_line(offset, false)?;
    }

    let bank = bank.bank()?;
    let mut q7 = bank.line(7)?;
    println!("Blinking Q7 through the OutputPin handle...");
    for _ in 0..3 {
        embedded_hal::digital::OutputPin::set_high(&mut q7)?;
        thread::sleep(Duration::from_millis(250));
        embedded_hal::digital::OutputPin::set_low(&mut q7)?;
        thread::sleep(Duration::from_millis(250));
    }
    Ok(())
}
