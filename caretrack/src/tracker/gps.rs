//! UDP listener for NMEA position sentences.
//!
//! Phone GPS-sharing apps broadcast NMEA 0183 sentences over UDP on the
//! local network. This source listens for GGA sentences (the fix sentence
//! carrying latitude, longitude, fix quality, and HDOP) and converts them to
//! [`DeviceFix`] events.
//!
//! The most recent fix is remembered across watches, so a new subscription
//! can be seeded immediately with a cached fix that is still within the
//! requested maximum age.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::error::TrackerError;
use super::source::{DeviceFix, DevicePositionSource, PositionEvent, PositionWatch, WatchOptions};

/// Conventional port for NMEA over UDP.
const DEFAULT_NMEA_PORT: u16 = 10110;

/// Maximum datagram size we expect; NMEA sentences are under 82 bytes.
const MAX_DATAGRAM_SIZE: usize = 256;

/// Event channel capacity per watch.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Typical user-equivalent range error for consumer GPS, in meters.
/// Multiplied by HDOP to estimate horizontal accuracy.
const GPS_UERE_METERS: f64 = 5.0;

/// Configuration for the UDP GPS feed.
#[derive(Debug, Clone)]
pub struct GpsFeedConfig {
    /// UDP port to listen on.
    pub port: u16,

    /// Minimum interval between emitted fixes.
    pub min_update_interval: Duration,
}

impl Default for GpsFeedConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_NMEA_PORT,
            min_update_interval: Duration::from_millis(1000),
        }
    }
}

/// Position source backed by a UDP NMEA feed.
pub struct UdpGpsSource {
    config: GpsFeedConfig,
    last_fix: Arc<Mutex<Option<(DeviceFix, Instant)>>>,
}

impl UdpGpsSource {
    /// Create a source with the given feed configuration.
    pub fn new(config: GpsFeedConfig) -> Self {
        Self {
            config,
            last_fix: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a source on the conventional NMEA port.
    pub fn with_defaults() -> Self {
        Self::new(GpsFeedConfig::default())
    }

    /// The configured port.
    pub fn port(&self) -> u16 {
        self.config.port
    }
}

impl DevicePositionSource for UdpGpsSource {
    fn watch(&self, options: &WatchOptions) -> Result<PositionWatch, TrackerError> {
        // Bind synchronously so an unusable socket surfaces as a refused
        // watch rather than an error event later.
        let socket =
            std::net::UdpSocket::bind(("0.0.0.0", self.config.port)).map_err(|source| {
                TrackerError::SocketBind {
                    port: self.config.port,
                    source,
                }
            })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| TrackerError::SocketBind {
                port: self.config.port,
                source,
            })?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        // Seed the watch with the cached fix when it is fresh enough.
        if let Some((fix, at)) = *self.last_fix.lock().unwrap() {
            if at.elapsed() <= options.max_fix_age {
                let _ = events_tx.try_send(PositionEvent::Fix(fix));
            }
        }

        tokio::spawn(run_feed(
            socket,
            events_tx,
            cancel.clone(),
            self.config.min_update_interval,
            Arc::clone(&self.last_fix),
        ));

        Ok(PositionWatch::new(events_rx, cancel))
    }
}

/// Receive loop: parse datagrams and emit rate-limited fixes until the
/// watch is cancelled or the consumer goes away.
async fn run_feed(
    socket: std::net::UdpSocket,
    events_tx: mpsc::Sender<PositionEvent>,
    cancel: CancellationToken,
    min_update_interval: Duration,
    last_fix: Arc<Mutex<Option<(DeviceFix, Instant)>>>,
) {
    let socket = match UdpSocket::from_std(socket) {
        Ok(socket) => socket,
        Err(error) => {
            let _ = events_tx
                .try_send(PositionEvent::Error(format!("position feed socket: {error}")));
            return;
        }
    };

    info!(local_addr = ?socket.local_addr().ok(), "GPS feed listener started");

    let mut buffer = [0u8; MAX_DATAGRAM_SIZE];
    let mut last_emit: Option<Instant> = None;
    let mut fixes_emitted: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv(&mut buffer) => match received {
                Ok(len) => {
                    let Some(fix) = parse_sentence(&buffer[..len]) else {
                        trace!(len, "Ignored datagram without a usable fix");
                        continue;
                    };

                    *last_fix.lock().unwrap() = Some((fix, Instant::now()));

                    if last_emit.is_some_and(|t| t.elapsed() < min_update_interval) {
                        continue;
                    }
                    match events_tx.try_send(PositionEvent::Fix(fix)) {
                        Ok(()) => {
                            fixes_emitted += 1;
                            if fixes_emitted == 1 {
                                info!(
                                    lat = format!("{:.4}", fix.latitude),
                                    lon = format!("{:.4}", fix.longitude),
                                    "First GPS fix received"
                                );
                            }
                            last_emit = Some(Instant::now());
                        }
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            trace!("Event channel full, fix dropped");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            debug!("Watch consumer gone, stopping GPS feed");
                            break;
                        }
                    }
                }
                Err(error) => {
                    warn!(error = %error, "GPS feed receive error");
                    let _ = events_tx
                        .try_send(PositionEvent::Error(format!("position feed: {error}")));
                    break;
                }
            }
        }
    }

    debug!(fixes_emitted, "GPS feed listener stopped");
}

/// Parse one datagram into a fix.
///
/// Accepts GGA sentences from any talker (`$GPGGA`, `$GNGGA`, ...), with or
/// without the trailing checksum. Sentences without a fix (quality 0) and
/// out-of-range coordinates yield nothing.
fn parse_sentence(data: &[u8]) -> Option<DeviceFix> {
    let text = std::str::from_utf8(data).ok()?;
    let line = text.trim();
    let line = line.split('*').next()?;

    let bytes = line.as_bytes();
    if bytes.len() < 6 || bytes[0] != b'$' || &bytes[3..6] != b"GGA" {
        return None;
    }

    let parts: Vec<&str> = line.split(',').collect();
    // $xxGGA,time,lat,N/S,lon,E/W,quality,numsv,hdop,...
    if parts.len() < 9 {
        return None;
    }

    let quality: u8 = parts[6].parse().ok()?;
    if quality == 0 {
        return None;
    }

    let latitude = parse_angle(parts[2], parts[3], 2)?;
    let longitude = parse_angle(parts[4], parts[5], 3)?;
    if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
        return None;
    }

    let accuracy = parts[8]
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite() && *h > 0.0)
        .map(|h| h * GPS_UERE_METERS);

    Some(DeviceFix {
        latitude,
        longitude,
        accuracy,
    })
}

/// Parse an NMEA angle field (`ddmm.mmmm` or `dddmm.mmmm`) with its
/// hemisphere indicator.
fn parse_angle(field: &str, hemisphere: &str, degree_digits: usize) -> Option<f64> {
    if field.len() <= degree_digits || !field.is_ascii() {
        return None;
    }
    let degrees: f64 = field[..degree_digits].parse().ok()?;
    let minutes: f64 = field[degree_digits..].parse().ok()?;
    let value = degrees + minutes / 60.0;

    match hemisphere {
        "N" | "E" => Some(value),
        "S" | "W" => Some(-value),
        _ => None,
    }
}
