use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

const READ_CHUNK_SIZE: usize = 256;

#[derive(displaydoc::Display, Debug)]
pub enum TransportError {
    /// I/O error: {0}
    Io(io::Error),
    /// modbus exception code {0:#04x}
    Exception(u8),
    /// modbus error: {0}
    Modbus(String),
    /// connection is closed
    Closed,
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl std::error::Error for TransportError {}

/// A bidirectional byte channel to one or more hands, such as a serial port.
///
/// Frames carry no transaction id, so a transport must never be shared between callers without
/// some external lock around each request and its reply.
pub trait ByteTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Returns whatever bytes arrive within `timeout`. This is empty if nothing arrived, and never
    /// blocks for longer than `timeout`.
    fn read_available(&mut self, timeout: Duration) -> io::Result<Vec<u8>>;

    fn close(&mut self) -> io::Result<()>;
}

fn read_chunk(reader: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut chunk = [0; READ_CHUNK_SIZE];
    match reader.read(&mut chunk) {
        Ok(0) => Err(io::ErrorKind::UnexpectedEof.into()),
        Ok(bytes_read) => Ok(chunk[..bytes_read].to_vec()),
        Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            Ok(vec![])
        }
        Err(e) => Err(e),
    }
}

#[cfg(feature = "serial")]
mod serial {
    use super::*;
    use serialport::{DataBits, Parity, SerialPort, StopBits};

    /// Opens a serial port with the framing the hand expects: 8 data bits, no parity, 1 stop bit.
    pub fn open_serial(path: &str, baud_rate: u32) -> serialport::Result<Box<dyn SerialPort>> {
        serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .open()
    }

    impl ByteTransport for Box<dyn SerialPort> {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.write_all(bytes)?;
            self.flush()
        }

        fn read_available(&mut self, timeout: Duration) -> io::Result<Vec<u8>> {
            self.set_timeout(timeout)?;
            read_chunk(self)
        }

        fn close(&mut self) -> io::Result<()> {
            // The port itself is closed when it is dropped.
            self.flush()
        }
    }
}

#[cfg(feature = "serial")]
pub use serial::open_serial;

/// For RS485-to-Ethernet converters, which pass frames through unchanged.
impl ByteTransport for TcpStream {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }

    fn read_available(&mut self, timeout: Duration) -> io::Result<Vec<u8>> {
        // A zero timeout means "block forever" to set_read_timeout.
        self.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
        read_chunk(self)
    }

    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}
