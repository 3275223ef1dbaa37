use clap::Parser;
use mbtcp_tools::common::{TcpConnectionArgs, build_client, init_tracing};

#[derive(Debug, Parser)]
#[command(name = "readinput", about = "Read input registers (FC04)")]
struct Args {
    #[command(flatten)]
    conn: TcpConnectionArgs,
    #[arg(long)]
    start: u16,
    #[arg(long, default_value_t = 1)]
    quantity: u16,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let mut client = build_client(&args.conn);

    let mut values = vec![0u16; usize::from(args.quantity)];
    client.read_input_registers(args.start, &mut values)?;
    for (idx, value) in values.iter().enumerate() {
        println!(
            "addr={} value={} (0x{:04X})",
            args.start.wrapping_add(idx as u16),
            value,
            value
        );
    }
    Ok(())
}
