//! Stream transports the client runs its transactions over.

use crate::ClientError;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::trace;

/// Socket buffer size fitting a few maximum-size frames.
pub const DEFAULT_SOCKET_BUFFER_SIZE: usize = 512;

/// A connected, bidirectional byte stream.
///
/// Reads may return fewer bytes than requested. A deadline, once set, bounds
/// every subsequent read and write until it is cleared with `None`; I/O past
/// the deadline fails with [`io::ErrorKind::TimedOut`] or
/// [`io::ErrorKind::WouldBlock`].
pub trait Transport: Read + Write {
    fn set_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()>;

    /// Releases the stream.
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

/// Creates transports for an address.
pub trait Dialer {
    type Transport: Transport;

    /// Connects to `addr` (`host:port`). A zero `timeout` waits for the
    /// operating system's connect timeout.
    fn dial(&self, addr: &str, timeout: Duration) -> Result<Self::Transport, ClientError>;
}

/// Dials TCP with small socket buffers, no keep-alive probes and no Nagle delay.
#[derive(Debug, Clone, Copy)]
pub struct TcpDialer {
    pub socket_buffer_size: usize,
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self {
            socket_buffer_size: DEFAULT_SOCKET_BUFFER_SIZE,
        }
    }
}

impl TcpDialer {
    pub fn with_socket_buffer_size(mut self, size: usize) -> Self {
        self.socket_buffer_size = size;
        self
    }

    fn tuned_socket(&self, target: &SocketAddr) -> Result<Socket, ClientError> {
        let socket = Socket::new(Domain::for_address(*target), Type::STREAM, Some(Protocol::TCP))
            .map_err(ClientError::Tune)?;
        socket
            .set_recv_buffer_size(self.socket_buffer_size)
            .map_err(ClientError::Tune)?;
        socket
            .set_send_buffer_size(self.socket_buffer_size)
            .map_err(ClientError::Tune)?;
        // the transaction deadline already detects dead peers
        socket.set_keepalive(false).map_err(ClientError::Tune)?;
        socket.set_nodelay(true).map_err(ClientError::Tune)?;
        Ok(socket)
    }
}

impl Dialer for TcpDialer {
    type Transport = TcpTransport;

    fn dial(&self, addr: &str, timeout: Duration) -> Result<TcpTransport, ClientError> {
        let targets: Vec<SocketAddr> = addr
            .to_socket_addrs()
            .map_err(|source| ClientError::Resolve {
                addr: addr.to_owned(),
                source,
            })?
            .collect();

        let mut last_err = io::Error::new(io::ErrorKind::InvalidInput, "no addresses resolved");
        for target in &targets {
            let socket = self.tuned_socket(target)?;
            let sock_addr = SockAddr::from(*target);
            let connected = if timeout.is_zero() {
                socket.connect(&sock_addr)
            } else {
                socket.connect_timeout(&sock_addr, timeout)
            };
            match connected {
                Ok(()) => {
                    trace!(%target, "modbus tcp socket connected");
                    return Ok(TcpTransport::new(TcpStream::from(socket)));
                }
                Err(err) => {
                    trace!(%target, error = %err, "modbus tcp connect attempt failed");
                    last_err = err;
                }
            }
        }

        if targets.is_empty() {
            return Err(ClientError::Resolve {
                addr: addr.to_owned(),
                source: last_err,
            });
        }
        Err(ClientError::Dial {
            addr: addr.to_owned(),
            source: last_err,
        })
    }
}

/// A TCP stream bounded by an absolute deadline.
///
/// Socket timeouts are relative, so each read and write re-arms them with
/// the budget left until the deadline.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    deadline: Option<Instant>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            deadline: None,
        }
    }

    fn remaining(&self) -> io::Result<Option<Duration>> {
        let Some(deadline) = self.deadline else {
            return Ok(None);
        };
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "transaction deadline exceeded",
            ));
        }
        Ok(Some(left))
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(left) = self.remaining()? {
            self.stream.set_read_timeout(Some(left))?;
        }
        self.stream.read(buf)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(left) = self.remaining()? {
            self.stream.set_write_timeout(Some(left))?;
        }
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpTransport {
    fn set_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.deadline = deadline;
        if deadline.is_none() {
            self.stream.set_read_timeout(None)?;
            self.stream.set_write_timeout(None)?;
        }
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            // the peer got there first
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
