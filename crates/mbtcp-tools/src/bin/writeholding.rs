use clap::Parser;
use mbtcp_tools::common::{TcpConnectionArgs, build_client, init_tracing, parse_u16};

#[derive(Debug, Parser)]
#[command(
    name = "writeholding",
    about = "Write one or more holding registers (FC06/FC16)"
)]
struct Args {
    #[command(flatten)]
    conn: TcpConnectionArgs,
    #[arg(long)]
    start: u16,
    #[arg(long, value_delimiter = ',', num_args = 1.., value_parser = parse_u16)]
    values: Vec<u16>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let mut client = build_client(&args.conn);

    if let [value] = args.values.as_slice() {
        client.write_register(args.start, *value)?;
    } else {
        client.write_registers(args.start, &args.values)?;
    }

    println!(
        "wrote {} register(s) starting at {}",
        args.values.len(),
        args.start
    );
    Ok(())
}
