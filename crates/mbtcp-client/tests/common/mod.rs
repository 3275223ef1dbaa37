//! A register-only Modbus TCP device on a loopback port.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const REGISTER_COUNT: usize = 2048;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const FRAGMENT_GAP: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceOptions {
    /// Send each response in two writes split at this offset.
    pub split_at: Option<usize>,
    /// Close the connection after this many responses.
    pub close_after: Option<usize>,
    /// Read requests but never answer.
    pub silent: bool,
}

#[derive(Default)]
struct State {
    holding: Vec<u16>,
    input: Vec<u16>,
}

pub struct RegisterDevice {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    requests: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RegisterDevice {
    pub fn start() -> Self {
        Self::start_with(DeviceOptions::default())
    }

    pub fn start_with(options: DeviceOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("device should bind");
        let addr = listener.local_addr().expect("local addr should be available");
        listener
            .set_nonblocking(true)
            .expect("listener should go non-blocking");

        let state = Arc::new(Mutex::new(State {
            holding: vec![0; REGISTER_COUNT],
            input: vec![0; REGISTER_COUNT],
        }));
        let requests = Arc::new(AtomicUsize::new(0));
        let connections = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            options,
            state: Arc::clone(&state),
            requests: Arc::clone(&requests),
            stop: Arc::clone(&stop),
        };
        let accepted = Arc::clone(&connections);
        let thread = thread::spawn(move || {
            while !worker.stop.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        accepted.fetch_add(1, Ordering::SeqCst);
                        worker.serve(stream);
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        thread::sleep(POLL_INTERVAL);
                    }
                    Err(_) => return,
                }
            }
        });

        Self {
            addr,
            state,
            requests,
            connections,
            stop,
            thread: Some(thread),
        }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    pub fn set_input(&self, address: usize, value: u16) {
        self.state.lock().unwrap().input[address] = value;
    }

    pub fn holding(&self, address: usize) -> u16 {
        self.state.lock().unwrap().holding[address]
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for RegisterDevice {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct Worker {
    options: DeviceOptions,
    state: Arc<Mutex<State>>,
    requests: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
}

impl Worker {
    /// Serves one connection until the client leaves or the device stops.
    fn serve(&self, mut stream: TcpStream) {
        let _ = stream.set_nonblocking(false);
        let _ = stream.set_nodelay(true);
        let _ = stream.set_read_timeout(Some(Duration::from_millis(20)));

        let mut answered = 0;
        loop {
            let Some((header, pdu)) = self.next_request(&mut stream) else {
                return;
            };
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.options.silent {
                continue;
            }

            let reply = self.handle(&pdu);
            let mut frame = Vec::with_capacity(7 + reply.len());
            frame.extend_from_slice(&header[..4]);
            frame.extend_from_slice(&(reply.len() as u16 + 1).to_be_bytes());
            frame.push(header[6]);
            frame.extend_from_slice(&reply);

            if self.send(&mut stream, &frame).is_err() {
                return;
            }

            answered += 1;
            if self.options.close_after == Some(answered) {
                return;
            }
        }
    }

    fn send(&self, stream: &mut TcpStream, frame: &[u8]) -> io::Result<()> {
        let Some(at) = self.options.split_at.filter(|&at| at < frame.len()) else {
            return stream.write_all(frame);
        };
        stream.write_all(&frame[..at])?;
        stream.flush()?;
        thread::sleep(FRAGMENT_GAP);
        stream.write_all(&frame[at..])
    }

    fn next_request(&self, stream: &mut TcpStream) -> Option<([u8; 7], Vec<u8>)> {
        let mut header = [0u8; 7];
        self.fill(stream, &mut header)?;
        let length = usize::from(u16::from_be_bytes([header[4], header[5]]));
        let mut pdu = vec![0u8; length.saturating_sub(1)];
        self.fill(stream, &mut pdu)?;
        Some((header, pdu))
    }

    /// `read_exact` that keeps polling the stop flag while idle.
    fn fill(&self, stream: &mut TcpStream, buf: &mut [u8]) -> Option<()> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.stop.load(Ordering::SeqCst) {
                return None;
            }
            match stream.read(&mut buf[filled..]) {
                Ok(0) => return None,
                Ok(n) => filled += n,
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) => {}
                Err(_) => return None,
            }
        }
        Some(())
    }

    fn handle(&self, pdu: &[u8]) -> Vec<u8> {
        let Some((&function, body)) = pdu.split_first() else {
            return vec![0x80, 0x01];
        };
        let word = |at: usize| {
            body.get(at..at + 2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
        };
        let exception = |code: u8| vec![function | 0x80, code];
        let mut state = self.state.lock().unwrap();

        match function {
            0x03 | 0x04 => {
                let (Some(start), Some(quantity)) = (word(0), word(2)) else {
                    return exception(0x03);
                };
                let (start, quantity) = (usize::from(start), usize::from(quantity));
                if quantity == 0 || quantity > 125 {
                    return exception(0x03);
                }
                if start + quantity > REGISTER_COUNT {
                    return exception(0x02);
                }
                let table = if function == 0x03 {
                    &state.holding
                } else {
                    &state.input
                };
                let mut reply = vec![function, (quantity * 2) as u8];
                for value in &table[start..start + quantity] {
                    reply.extend_from_slice(&value.to_be_bytes());
                }
                reply
            }
            0x06 => {
                let (Some(address), Some(value)) = (word(0), word(2)) else {
                    return exception(0x03);
                };
                if usize::from(address) >= REGISTER_COUNT {
                    return exception(0x02);
                }
                state.holding[usize::from(address)] = value;
                pdu.to_vec()
            }
            0x10 => {
                let (Some(start), Some(quantity)) = (word(0), word(2)) else {
                    return exception(0x03);
                };
                let (first, count) = (usize::from(start), usize::from(quantity));
                if count == 0 || count > 123 || body.len() != 5 + count * 2 {
                    return exception(0x03);
                }
                if first + count > REGISTER_COUNT {
                    return exception(0x02);
                }
                for i in 0..count {
                    if let Some(value) = word(5 + i * 2) {
                        state.holding[first + i] = value;
                    }
                }
                let mut reply = vec![function];
                reply.extend_from_slice(&start.to_be_bytes());
                reply.extend_from_slice(&quantity.to_be_bytes());
                reply
            }
            _ => exception(0x01),
        }
    }
}
