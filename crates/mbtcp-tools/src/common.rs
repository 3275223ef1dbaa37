use clap::Args;
use mbtcp_client::{ClientConfig, DEFAULT_UNIT_ID, ModbusTcpClient};
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct TcpConnectionArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 502)]
    pub port: u16,
    /// Dial and per-transaction timeout in milliseconds; 0 waits forever.
    #[arg(long, default_value_t = 1000)]
    pub timeout: u64,
    #[arg(long, default_value_t = DEFAULT_UNIT_ID)]
    pub unit_id: u8,
}

impl TcpConnectionArgs {
    pub fn addr(&self) -> String {
        // bracket bare IPv6 literals so the port separator stays unambiguous
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Builds a client for the arguments. No I/O happens until the first request.
pub fn build_client(args: &TcpConnectionArgs) -> ModbusTcpClient {
    let config = ClientConfig::default()
        .with_transaction_timeout(Duration::from_millis(args.timeout))
        .with_unit_id(args.unit_id);
    ModbusTcpClient::with_config(args.addr(), config)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

/// Parses a register value in decimal or `0x`-prefixed hexadecimal.
pub fn parse_u16(input: &str) -> Result<u16, String> {
    let trimmed = input.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|err| format!("invalid register value {input:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{TcpConnectionArgs, parse_u16};

    #[test]
    fn parses_decimal_and_hex_values() {
        assert_eq!(parse_u16("42"), Ok(42));
        assert_eq!(parse_u16(" 0xBEEF "), Ok(0xBEEF));
        assert_eq!(parse_u16("0Xff"), Ok(0xFF));
        assert!(parse_u16("65536").is_err());
        assert!(parse_u16("0xZZ").is_err());
    }

    #[test]
    fn brackets_ipv6_hosts() {
        let mut args = TcpConnectionArgs {
            host: "::1".to_owned(),
            port: 5020,
            timeout: 1000,
            unit_id: 1,
        };
        assert_eq!(args.addr(), "[::1]:5020");
        args.host = "plc.local".to_owned();
        assert_eq!(args.addr(), "plc.local:5020");
    }
}
