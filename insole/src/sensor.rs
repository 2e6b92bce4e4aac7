// Pressure sensor client
// One fixed request, one fixed-size reply, bounded by a single deadline

use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use insole_common::SENSOR_FRAME_LEN;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SensorConfig;

/// Request that makes the sensor send one frame
pub const FRAME_REQUEST: [u8; 3] = [0x00, 0x01, 0x02];

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("could not resolve sensor address {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("sensor address {0} did not resolve to any socket address")]
    NoAddress(String),

    #[error("could not connect to sensor at {address}: {source}")]
    Connect {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("sensor at {address} timed out after {timeout:?} ({received} bytes received)")]
    Timeout {
        address: SocketAddr,
        timeout: Duration,
        received: usize,
    },

    #[error("sensor I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Fetch one raw frame from the sensor
///
/// Reads until [`SENSOR_FRAME_LEN`] bytes arrive or the sensor closes the
/// connection. A frame cut short by EOF is returned as-is; the decoder
/// reports the shortfall. Failures are not retried.
pub fn fetch_payload(config: &SensorConfig) -> Result<Vec<u8>, SensorError> {
    let address_text = config.address();
    let address = address_text
        .to_socket_addrs()
        .map_err(|source| SensorError::Resolve {
            address: address_text.clone(),
            source,
        })?
        .next()
        .ok_or_else(|| SensorError::NoAddress(address_text.clone()))?;

    let timeout = config.timeout();
    let deadline = Instant::now() + timeout;
    let timed_out = |received: usize| SensorError::Timeout {
        address,
        timeout,
        received,
    };

    info!("Connecting to pressure sensor at {}", address);
    let mut stream = TcpStream::connect_timeout(&address, timeout).map_err(|source| {
        if is_timeout(&source) {
            timed_out(0)
        } else {
            SensorError::Connect { address, source }
        }
    })?;
    stream.set_write_timeout(Some(timeout))?;

    stream.write_all(&FRAME_REQUEST).map_err(|err| {
        if is_timeout(&err) {
            timed_out(0)
        } else {
            SensorError::Io(err)
        }
    })?;

    let mut frame = vec![0u8; SENSOR_FRAME_LEN];
    let mut received = 0;

    while received < SENSOR_FRAME_LEN {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timed_out(received));
        }
        stream.set_read_timeout(Some(remaining))?;

        match stream.read(&mut frame[received..]) {
            Ok(0) => {
                debug!("Sensor closed the connection after {} bytes", received);
                break;
            }
            Ok(n) => received += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(&err) => return Err(timed_out(received)),
            Err(err) => return Err(SensorError::Io(err)),
        }
    }

    frame.truncate(received);
    info!("Received {} bytes from sensor", received);
    Ok(frame)
}

/// Socket timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows
fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}
