use clap::Parser;
use mbtcp_tools::common::{TcpConnectionArgs, build_client, init_tracing};

#[derive(Debug, Parser)]
#[command(name = "readholding", about = "Read holding registers (FC03)")]
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

    let values = client.read_holding_register_view(args.start, usize::from(args.quantity))?;
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
