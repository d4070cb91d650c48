//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Trait for line-oriented serial port I/O
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Read one line without its CR/LF terminator
    ///
    /// Returns `Ok(None)` if no complete line arrives within `timeout`.
    /// A partial line is kept and completed by the next call.
    async fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>>;
}

/// Line-buffered port over any async byte stream
pub struct StreamPort<T> {
    stream: BufReader<T>,
    pending: Vec<u8>,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> StreamPort<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream: BufReader::new(stream),
            pending: Vec::new(),
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending)
            .trim_end_matches(&['\r', '\n'][..])
            .to_string();
        self.pending.clear();
        line
    }
}

/// Serial port backed by `tokio_serial`
pub type TokioSerialPort = StreamPort<tokio_serial::SerialStream>;

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPortIO for StreamPort<T> {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.get_mut().write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.stream.get_mut().flush().await
    }

    async fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        loop {
            let read = tokio::time::timeout(
                timeout,
                self.stream.read_until(b'\n', &mut self.pending),
            )
            .await;

            match read {
                Err(_elapsed) => return Ok(None),
                Ok(Err(e)) => return Err(e),
                Ok(Ok(0)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial port closed",
                    ))
                }
                Ok(Ok(_)) => {
                    let line = self.take_line();
                    // Modems emit blank lines between replies
                    if !line.is_empty() {
                        return Ok(Some(line));
                    }
                }
            }
        }
    }
}
