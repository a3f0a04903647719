use spi_shift_gpio::{
    attach, BankConfig, BusError, DeviceDescription, Error, LineTable, Result, TransferParams,
    Transport,
};
use std::sync::{Arc, Mutex};

struct NamedBus(&'static str);

impl Transport for NamedBus {
    fn configure(&mut self, _params: &TransferParams) -> std::result::Result<(), BusError> {
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> std::result::Result<(), BusError> {
        println!("{} <- {:02X?}", self.0, bytes);
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let table = Arc::new(Mutex::new(LineTable::new()));
    let config = BankConfig::without_self_test();

    let _relays = attach(&DeviceDescription::new(12), NamedBus("relays"), table.clone(), &config)?;
    let _leds = attach(&DeviceDescription::new(20), NamedBus("leds"), table.clone(), &config)?;

    // A third bank overlapping the first is refused and never registered.
    match attach(&DeviceDescription::new(16), NamedBus("overlap"), table.clone(), &config) {
        Err(Error::Registry(e)) => println!("Third bank refused: {}", e),
        Err(e) => return Err(e),
        Ok(_) => println!("Unexpectedly attached overlapping bank"),
    }

    let table = table.lock().unwrap_or_else(|e| e.into_inner());
    println!("Registered banks: {:?}", table.banks().collect::<Vec<_>>());
    for line in [12, 15, 20, 27] {
        println!("Setting line {} high", line);
        table.set_value(line, true)?;
    }
    if let Err(e) = table.set_value(40, true) {
        println!("Line 40: {}", e);
    }
    Ok(())
}
