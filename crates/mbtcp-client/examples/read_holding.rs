use mbtcp_client::ModbusTcpClient;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = ModbusTcpClient::new("127.0.0.1:502", Duration::from_secs(1));

    let mut values = [0u16; 4];
    client.read_holding_registers(0, &mut values)?;
    println!("holding registers: {values:?}");
    Ok(())
}
