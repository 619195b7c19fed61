//! Noisy-line loopback: frames go out through a TCP "serial bridge" that
//! corrupts and drops bytes, and the receiver reports what survived.
//!
//! Run with:
//!   cargo run --example loopback

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use uartframe::frame::{DecodeEvent, FrameConfig, FrameError, FrameReader, FrameWriter};

const MESSAGES: usize = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    eprintln!("Bridge listening on {addr}");

    let sender = thread::spawn(move || -> Result<(), FrameError> {
        let stream = TcpStream::connect(addr)?;
        let mut writer = FrameWriter::new(NoisyLine::new(stream));
        for n in 0..MESSAGES {
            let payload = format!("reading #{n}: {} mV", 3300 - n * 7);
            writer.send(n as u16, payload.as_bytes())?;
        }
        Ok(())
    });

    let (stream, _) = listener.accept()?;
    let config = FrameConfig {
        read_timeout: Some(Duration::from_secs(2)),
        frame_timeout: Some(Duration::from_millis(200)),
        ..FrameConfig::default()
    };
    let mut reader = FrameReader::with_config_tcp(stream, config)?;

    loop {
        match reader.read_event() {
            Ok(DecodeEvent::Frame(frame)) => eprintln!(
                "frame 0x{:04X}: {}",
                frame.id,
                String::from_utf8_lossy(&frame.payload)
            ),
            Ok(DecodeEvent::Error(err)) => eprintln!("line error: {err}"),
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(err.into()),
        }
    }

    match sender.join() {
        Ok(result) => result?,
        Err(_) => return Err("sender thread panicked".into()),
    }

    let stats = reader.decoder().stats();
    eprintln!(
        "{} of {MESSAGES} frames survived, {} errors, {} bytes skipped",
        stats.frames_decoded, stats.errors, stats.bytes_skipped
    );
    Ok(())
}

/// Flips a bit every 97th byte and drops every 211th.
struct NoisyLine<W> {
    inner: W,
    count: usize,
}

impl<W> NoisyLine<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for NoisyLine<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut out = Vec::with_capacity(buf.len());
        for &byte in buf {
            self.count += 1;
            if self.count % 211 == 0 {
                continue;
            }
            if self.count % 97 == 0 {
                out.push(byte ^ 0x04);
            } else {
                out.push(byte);
            }
        }
        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
