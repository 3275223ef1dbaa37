use clap::Parser;
use mbtcp_tools::common::{TcpConnectionArgs, build_client, init_tracing};

#[derive(Debug, Parser)]
#[command(
    name = "readfloat",
    about = "Read an IEEE 754 value spread over registers, high word first"
)]
struct Args {
    #[command(flatten)]
    conn: TcpConnectionArgs,
    #[arg(long)]
    start: u16,
    /// Read input registers (FC04) instead of holding registers (FC03).
    #[arg(long)]
    input: bool,
    /// Read a 64-bit double from four holding registers.
    #[arg(long, conflicts_with = "input")]
    double: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let mut client = build_client(&args.conn);

    if args.double {
        println!("addr={} value={}", args.start, client.read_holding_f64(args.start)?);
    } else if args.input {
        println!("addr={} value={}", args.start, client.read_input_f32(args.start)?);
    } else {
        println!("addr={} value={}", args.start, client.read_holding_f32(args.start)?);
    }
    Ok(())
}
