use crate::ClientError;
use crate::connection::Connection;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::transport::{Dialer, TcpDialer, Transport};
use mbtcp_core::encoding::{Reader, Writer};
use mbtcp_core::float;
use mbtcp_core::{DecodeError, EncodeError};
use mbtcp_core::frame::tcp::{
    self, FrameBuf, FrameProgress, MAX_FRAME_LEN, MIN_RESPONSE_LEN, MbapHeader, PAYLOAD_OFFSET,
    ResponseKind,
};
use mbtcp_core::pdu::{
    FunctionCode, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS, RegisterView, check_quantity,
};
use std::fmt;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Broadcast/"unit not applicable" address accepted by most TCP devices.
pub const DEFAULT_UNIT_ID: u8 = 0xFF;
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(1);

/// Register data starts after the byte-count field of a read response.
const REGISTERS_OFFSET: usize = PAYLOAD_OFFSET + 1;
/// Header, function code, address and value (or count) of a write echo.
const WRITE_ECHO_LEN: usize = PAYLOAD_OFFSET + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bounds dial and each full request/response round trip. Zero disables
    /// the bound.
    pub transaction_timeout: Duration,
    pub unit_id: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
            unit_id: DEFAULT_UNIT_ID,
        }
    }
}

impl ClientConfig {
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }
}

/// Blocking Modbus TCP client for one device.
///
/// The connection is dialed lazily by the first operation that needs it and
/// torn down by any fatal error; the next operation redials. Limit
/// violations and device exceptions leave the connection in place.
///
/// One frame buffer serves both the request and the response, so register
/// views returned by the `*_view` methods borrow the client until dropped.
/// Operations take `&mut self`; share a client across threads behind a
/// `Mutex`.
pub struct ModbusTcpClient<D: Dialer = TcpDialer> {
    buf: FrameBuf,
    connection: Connection<D::Transport>,
    addr: String,
    config: ClientConfig,
    transaction_count: u64,
    fragment_count: u64,
    dialer: D,
    sink: Box<dyn DiagnosticSink>,
}

impl ModbusTcpClient<TcpDialer> {
    /// Targets `addr` (`host:port`) with the default unit id. No I/O happens
    /// until the first operation.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self::with_config(
            addr,
            ClientConfig::default().with_transaction_timeout(timeout),
        )
    }

    pub fn with_config(addr: impl Into<String>, config: ClientConfig) -> Self {
        Self::with_dialer(addr, config, TcpDialer::default())
    }
}

impl<D: Dialer> ModbusTcpClient<D> {
    pub fn with_dialer(addr: impl Into<String>, config: ClientConfig, dialer: D) -> Self {
        Self {
            buf: [0; MAX_FRAME_LEN],
            connection: Connection::default(),
            addr: addr.into(),
            config,
            transaction_count: 0,
            fragment_count: 0,
            dialer,
            sink: Box::new(TracingSink),
        }
    }

    /// Replaces the diagnostic sink (default: [`TracingSink`]).
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn config(&self) -> ClientConfig {
        self.config
    }

    pub fn unit_id(&self) -> u8 {
        self.config.unit_id
    }

    pub fn set_unit_id(&mut self, unit_id: u8) {
        self.config.unit_id = unit_id;
    }

    pub fn transaction_timeout(&self) -> Duration {
        self.config.transaction_timeout
    }

    /// Takes effect with the next transaction (or dial).
    pub fn set_transaction_timeout(&mut self, timeout: Duration) {
        self.config.transaction_timeout = timeout;
    }

    /// Transactions started over the client's lifetime, dial failures aside.
    pub fn transaction_count(&self) -> u64 {
        self.transaction_count
    }

    /// Responses that needed more than one read to arrive.
    pub fn fragment_count(&self) -> u64 {
        self.fragment_count
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Dials now instead of on the first operation. A no-op when connected.
    pub fn connect(&mut self) -> Result<(), ClientError> {
        let Self {
            connection,
            addr,
            config,
            dialer,
            sink,
            ..
        } = self;
        establish(connection, dialer, addr, config, sink.as_ref()).map(|_| ())
    }

    /// Closes the connection if there is one. The next operation redials.
    pub fn close(&mut self) -> Result<(), ClientError> {
        match self.connection.take() {
            Some(transport) => transport.close().map_err(ClientError::Close),
            None => Ok(()),
        }
    }

    pub fn read_holding_register(&mut self, address: u16) -> Result<u16, ClientError> {
        self.read_register(FunctionCode::ReadHoldingRegisters, address)
    }

    pub fn read_input_register(&mut self, address: u16) -> Result<u16, ClientError> {
        self.read_register(FunctionCode::ReadInputRegisters, address)
    }

    /// Fills `out` with the holding registers starting at `start`.
    ///
    /// An empty `out` is a no-op. More than 125 registers fail with
    /// [`ClientError::Limit`] before any I/O.
    pub fn read_holding_registers(
        &mut self,
        start: u16,
        out: &mut [u16],
    ) -> Result<(), ClientError> {
        self.read_registers(FunctionCode::ReadHoldingRegisters, start, out)
    }

    /// Fills `out` with the input registers starting at `start`.
    pub fn read_input_registers(
        &mut self,
        start: u16,
        out: &mut [u16],
    ) -> Result<(), ClientError> {
        self.read_registers(FunctionCode::ReadInputRegisters, start, out)
    }

    /// Reads `quantity` holding registers and borrows them straight from the
    /// frame buffer.
    pub fn read_holding_register_view(
        &mut self,
        start: u16,
        quantity: usize,
    ) -> Result<RegisterView<'_>, ClientError> {
        self.read_register_view(FunctionCode::ReadHoldingRegisters, start, quantity)
    }

    pub fn read_input_register_view(
        &mut self,
        start: u16,
        quantity: usize,
    ) -> Result<RegisterView<'_>, ClientError> {
        self.read_register_view(FunctionCode::ReadInputRegisters, start, quantity)
    }

    /// Writes one holding register and verifies the device's echo.
    pub fn write_register(&mut self, address: u16, value: u16) -> Result<(), ClientError> {
        let frame_len = {
            let mut w = Writer::new(&mut self.buf[PAYLOAD_OFFSET..]);
            w.write_be_u16(address)?;
            w.write_be_u16(value)?;
            PAYLOAD_OFFSET + w.position()
        };
        let received = self.transact(FunctionCode::WriteSingleRegister, frame_len)?;

        let (echoed_address, echoed_value) = self.write_echo(received)?;
        if echoed_address != address {
            return Err(self.fail(ClientError::AddressMismatch {
                expected: address,
                got: echoed_address,
            }));
        }
        if echoed_value != value {
            return Err(self.fail(ClientError::ValueMismatch {
                expected: value,
                got: echoed_value,
            }));
        }
        Ok(())
    }

    /// Writes `values` to consecutive holding registers from `start`.
    ///
    /// An empty slice is a no-op. More than 123 values fail with
    /// [`ClientError::Limit`] before any I/O.
    pub fn write_registers(&mut self, start: u16, values: &[u16]) -> Result<(), ClientError> {
        if values.is_empty() {
            return Ok(());
        }
        check_quantity(values.len(), MAX_WRITE_REGISTERS)?;
        let quantity = quantity_u16(values.len())?;

        let frame_len = {
            let mut w = Writer::new(&mut self.buf[PAYLOAD_OFFSET..]);
            w.write_be_u16(start)?;
            w.write_be_u16(quantity)?;
            w.write_u8(byte_count(values.len())?)?;
            w.write_be_u16s(values)?;
            PAYLOAD_OFFSET + w.position()
        };
        let received = self.transact(FunctionCode::WriteMultipleRegisters, frame_len)?;

        let (echoed_start, echoed_quantity) = self.write_echo(received)?;
        if echoed_start != start {
            return Err(self.fail(ClientError::AddressMismatch {
                expected: start,
                got: echoed_start,
            }));
        }
        if echoed_quantity != quantity {
            return Err(self.fail(ClientError::WriteCountMismatch {
                expected: quantity,
                got: echoed_quantity,
            }));
        }
        Ok(())
    }

    /// Reads an IEEE 754 single from two holding registers, high word first.
    pub fn read_holding_f32(&mut self, address: u16) -> Result<f32, ClientError> {
        let mut regs = [0u16; 2];
        self.read_holding_registers(address, &mut regs)?;
        Ok(float::f32_from_registers(regs))
    }

    pub fn read_input_f32(&mut self, address: u16) -> Result<f32, ClientError> {
        let mut regs = [0u16; 2];
        self.read_input_registers(address, &mut regs)?;
        Ok(float::f32_from_registers(regs))
    }

    pub fn read_holding_f64(&mut self, address: u16) -> Result<f64, ClientError> {
        let mut regs = [0u16; 4];
        self.read_holding_registers(address, &mut regs)?;
        Ok(float::f64_from_registers(regs))
    }

    pub fn write_f32(&mut self, address: u16, value: f32) -> Result<(), ClientError> {
        self.write_registers(address, &float::f32_to_registers(value))
    }

    pub fn write_f64(&mut self, address: u16, value: f64) -> Result<(), ClientError> {
        self.write_registers(address, &float::f64_to_registers(value))
    }

    fn read_register(&mut self, function: FunctionCode, address: u16) -> Result<u16, ClientError> {
        self.read_n_registers(function, address, 1)?;
        Ok(Reader::new(&self.buf[REGISTERS_OFFSET..]).read_be_u16()?)
    }

    fn read_registers(
        &mut self,
        function: FunctionCode,
        start: u16,
        out: &mut [u16],
    ) -> Result<(), ClientError> {
        if out.is_empty() {
            return Ok(());
        }
        check_quantity(out.len(), MAX_READ_REGISTERS)?;
        self.read_n_registers(function, start, out.len())?;
        Reader::new(&self.buf[REGISTERS_OFFSET..]).read_be_u16s(out)?;
        Ok(())
    }

    fn read_register_view(
        &mut self,
        function: FunctionCode,
        start: u16,
        quantity: usize,
    ) -> Result<RegisterView<'_>, ClientError> {
        if quantity == 0 {
            return Ok(RegisterView::EMPTY);
        }
        check_quantity(quantity, MAX_READ_REGISTERS)?;
        self.read_n_registers(function, start, quantity)?;
        Ok(RegisterView::new(
            &self.buf[REGISTERS_OFFSET..REGISTERS_OFFSET + quantity * 2],
        ))
    }

    /// Runs a read of `quantity` registers (already limit-checked, non-zero)
    /// and validates the response size. The registers are left in the frame
    /// buffer at [`REGISTERS_OFFSET`].
    fn read_n_registers(
        &mut self,
        function: FunctionCode,
        start: u16,
        quantity: usize,
    ) -> Result<(), ClientError> {
        let frame_len = {
            let mut w = Writer::new(&mut self.buf[PAYLOAD_OFFSET..]);
            w.write_be_u16(start)?;
            w.write_be_u16(quantity_u16(quantity)?)?;
            PAYLOAD_OFFSET + w.position()
        };
        let received = self.transact(function, frame_len)?;

        let expected_bytes = quantity * 2;
        let byte_count = usize::from(self.buf[PAYLOAD_OFFSET]);
        if byte_count != expected_bytes {
            return Err(self.fail(
                DecodeError::PayloadSize {
                    expected: expected_bytes,
                    got: byte_count,
                }
                .into(),
            ));
        }
        let expected_len = REGISTERS_OFFSET + expected_bytes;
        if received != expected_len {
            return Err(self.fail(
                DecodeError::FrameSize {
                    expected: expected_len,
                    got: received,
                }
                .into(),
            ));
        }
        Ok(())
    }

    /// Decodes the two words a write response echoes back.
    fn write_echo(&mut self, received: usize) -> Result<(u16, u16), ClientError> {
        if received != WRITE_ECHO_LEN {
            return Err(self.fail(
                DecodeError::FrameSize {
                    expected: WRITE_ECHO_LEN,
                    got: received,
                }
                .into(),
            ));
        }
        let mut r = Reader::new(&self.buf[PAYLOAD_OFFSET..WRITE_ECHO_LEN]);
        Ok((r.read_be_u16()?, r.read_be_u16()?))
    }

    /// Sends the request staged at [`PAYLOAD_OFFSET`] and receives the
    /// complete response into the frame buffer, returning its length.
    ///
    /// Fatal errors close the connection before they are returned.
    fn transact(&mut self, function: FunctionCode, frame_len: usize) -> Result<usize, ClientError> {
        let Self {
            buf,
            connection,
            addr,
            config,
            transaction_count,
            fragment_count,
            dialer,
            sink,
        } = self;
        let transport = establish(connection, dialer, addr, config, sink.as_ref())?;

        *transaction_count = transaction_count.wrapping_add(1);
        // the wire id is the low half of the counter
        let transaction_id = *transaction_count as u16;

        let mut exchange = Exchange {
            transport,
            buf,
            fragment_count,
            sink: sink.as_ref(),
        };
        let result = exchange.run(
            transaction_id,
            config.unit_id,
            function,
            frame_len,
            config.transaction_timeout,
        );

        match result {
            Err(err) if err.is_fatal() => Err(self.fail(err)),
            other => other,
        }
    }

    /// Drops the connection after a fatal error, folding a failed close into
    /// the returned error.
    fn fail(&mut self, cause: ClientError) -> ClientError {
        let err = match self.connection.take() {
            Some(transport) => match transport.close() {
                Ok(()) => cause,
                Err(close) => ClientError::Teardown {
                    cause: Box::new(cause),
                    close,
                },
            },
            None => cause,
        };
        self.sink.report(Diagnostic::TornDown {
            addr: &self.addr,
            cause: &err,
        });
        err
    }
}

impl<D: Dialer> fmt::Debug for ModbusTcpClient<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModbusTcpClient")
            .field("addr", &self.addr)
            .field("config", &self.config)
            .field("connected", &self.connection.is_connected())
            .field("transaction_count", &self.transaction_count)
            .field("fragment_count", &self.fragment_count)
            .finish_non_exhaustive()
    }
}

fn establish<'c, D: Dialer>(
    connection: &'c mut Connection<D::Transport>,
    dialer: &D,
    addr: &str,
    config: &ClientConfig,
    sink: &dyn DiagnosticSink,
) -> Result<&'c mut D::Transport, ClientError> {
    connection.get_or_try_connect(|| {
        let transport = dialer.dial(addr, config.transaction_timeout)?;
        sink.report(Diagnostic::Connected { addr });
        Ok(transport)
    })
}

fn quantity_u16(quantity: usize) -> Result<u16, ClientError> {
    u16::try_from(quantity).map_err(|_| EncodeError::ValueOutOfRange.into())
}

fn byte_count(quantity: usize) -> Result<u8, ClientError> {
    u8::try_from(quantity * 2).map_err(|_| EncodeError::ValueOutOfRange.into())
}

/// One request/response round trip over a live transport.
struct Exchange<'a, T> {
    transport: &'a mut T,
    buf: &'a mut FrameBuf,
    fragment_count: &'a mut u64,
    sink: &'a dyn DiagnosticSink,
}

impl<T: Transport> Exchange<'_, T> {
    fn run(
        &mut self,
        transaction_id: u16,
        unit_id: u8,
        function: FunctionCode,
        frame_len: usize,
        timeout: Duration,
    ) -> Result<usize, ClientError> {
        let request = tcp::encode_request_header(
            &mut self.buf[..],
            transaction_id,
            unit_id,
            function,
            frame_len,
        )?;

        if timeout.is_zero() {
            return self.round_trip(&request, function, frame_len);
        }

        self.transport
            .set_deadline(Some(Instant::now() + timeout))
            .map_err(ClientError::Deadline)?;
        let result = self.round_trip(&request, function, frame_len);
        if let Err(error) = self.transport.set_deadline(None) {
            self.sink.report(Diagnostic::DeadlineClearFailed { error: &error });
        }
        result
    }

    fn round_trip(
        &mut self,
        request: &MbapHeader,
        function: FunctionCode,
        frame_len: usize,
    ) -> Result<usize, ClientError> {
        debug!(
            transaction_id = request.transaction_id,
            unit_id = request.unit_id,
            function = function.as_u8(),
            frame_len,
            "dispatching modbus request"
        );
        self.transport
            .write_all(&self.buf[..frame_len])
            .map_err(ClientError::Submit)?;

        let (mut received, first_read) =
            read_at_least(&mut *self.transport, &mut self.buf[..], MIN_RESPONSE_LEN)
                .map_err(ClientError::ResponseUnavailable)?;

        let (header, kind) = tcp::match_response(request, function, &self.buf[..received])?;
        if let ResponseKind::Exception(exception) = kind {
            self.note_fragments(request.transaction_id, first_read, received);
            debug!(
                transaction_id = request.transaction_id,
                exception = %exception,
                "modbus device rejected request"
            );
            return Err(ClientError::Exception(exception));
        }

        let end = match tcp::reconcile_length(&header, received, self.buf.len())? {
            FrameProgress::Complete => received,
            FrameProgress::Partial { end } => end,
        };
        self.note_fragments(request.transaction_id, first_read, end);
        if received < end {
            self.transport
                .read_exact(&mut self.buf[received..end])
                .map_err(ClientError::IncompleteFrame)?;
            received = end;
        }

        trace!(
            transaction_id = request.transaction_id,
            len = received,
            "received modbus response"
        );
        Ok(received)
    }

    /// Counts a response whose first read fell short of its end, once per
    /// response however many reads it spans.
    fn note_fragments(&mut self, transaction_id: u16, first_read: usize, end: usize) {
        if first_read < end {
            *self.fragment_count += 1;
            self.sink.report(Diagnostic::Fragmented {
                transaction_id,
                received: first_read,
                end,
            });
        }
    }
}

/// Reads until at least `min` bytes are in `buf`, returning the total and
/// the size of the first read. A stream that ends first fails with
/// [`io::ErrorKind::UnexpectedEof`].
fn read_at_least<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    min: usize,
) -> io::Result<(usize, usize)> {
    let mut filled = 0;
    let mut first_read = None;
    while filled < min {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream closed after {filled} of at least {min} bytes"),
                ));
            }
            Ok(n) => {
                first_read.get_or_insert(n);
                filled += n;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok((filled, first_read.unwrap_or(filled)))
}
