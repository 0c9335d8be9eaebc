//! Pushes the per-frame turn decision to the turret controller.
//!
//! A publish never fails the frame loop. The serial link reopens itself on
//! the next publish after an error.

use serial2::SerialPort;
use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;

pub const ANGLE_TO_TURN: &str = "ANGLE_TO_TURN";
pub const IS_ALIGNED: &str = "IS_ALIGNED";

/// Named-value sink, one write per key.
pub trait TelemetryChannel {
    fn put_number(&mut self, key: &str, value: f64) -> crate::Result<()>;
    fn put_bool(&mut self, key: &str, value: bool) -> crate::Result<()>;
}

impl<T: TelemetryChannel + ?Sized> TelemetryChannel for Box<T> {
    fn put_number(&mut self, key: &str, value: f64) -> crate::Result<()> {
        (**self).put_number(key, value)
    }

    fn put_bool(&mut self, key: &str, value: bool) -> crate::Result<()> {
        (**self).put_bool(key, value)
    }
}

/// `KEY=value\n` lines over a serial port.
pub struct SerialChannel {
    path: PathBuf,
    baud_rate: u32,
    port: Option<SerialPort>,
}

impl SerialChannel {
    /// Does not touch the port until the first value is sent.
    pub fn new(path: impl Into<PathBuf>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            port: None,
        }
    }

    fn send(&mut self, key: &str, value: impl Display) -> crate::Result<()> {
        let mut port = match self.port.take() {
            Some(port) => port,
            None => {
                let port = SerialPort::open(&self.path, self.baud_rate)?;
                log::info!("telemetry connected on {}", self.path.display());
                port
            }
        };

        // a failed write drops the port, the next call reopens it
        Write::write_all(&mut port, format!("{key}={value}\n").as_bytes())?;
        self.port = Some(port);

        Ok(())
    }
}

impl TelemetryChannel for SerialChannel {
    fn put_number(&mut self, key: &str, value: f64) -> crate::Result<()> {
        self.send(key, value)
    }

    fn put_bool(&mut self, key: &str, value: bool) -> crate::Result<()> {
        self.send(key, value)
    }
}

/// Used when no controller is attached.
#[derive(Debug, Default)]
pub struct LogChannel;

impl TelemetryChannel for LogChannel {
    fn put_number(&mut self, key: &str, value: f64) -> crate::Result<()> {
        log::debug!("{key} = {value}");
        Ok(())
    }

    fn put_bool(&mut self, key: &str, value: bool) -> crate::Result<()> {
        log::debug!("{key} = {value}");
        Ok(())
    }
}

pub struct TelemetryPublisher<C> {
    channel: C,
    sent: u64,
    failed: u64,
}

impl<C: TelemetryChannel> TelemetryPublisher<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            sent: 0,
            failed: 0,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Returns whether both values went out. Errors are logged and dropped.
    pub fn publish(&mut self, angle_to_turn: f64, aligned: bool) -> bool {
        let result = self
            .channel
            .put_number(ANGLE_TO_TURN, angle_to_turn)
            .and_then(|()| self.channel.put_bool(IS_ALIGNED, aligned));

        match result {
            Ok(()) => {
                self.sent += 1;
                true
            }
            Err(err) => {
                self.failed += 1;
                log::warn!("DATA NOT SENDING: {err}");
                false
            }
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}

/// Serial ports a turret controller could be attached to.
pub fn list_devices() -> crate::Result<Vec<PathBuf>> {
    Ok(SerialPort::available_ports()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct Recorder {
        numbers: Vec<(String, f64)>,
        bools: Vec<(String, bool)>,
        down: bool,
    }

    impl TelemetryChannel for Recorder {
        fn put_number(&mut self, key: &str, value: f64) -> crate::Result<()> {
            if self.down {
                return Err(Error::Telemetry("table unavailable".into()));
            }
            self.numbers.push((key.to_string(), value));
            Ok(())
        }

        fn put_bool(&mut self, key: &str, value: bool) -> crate::Result<()> {
            if self.down {
                return Err(Error::Telemetry("table unavailable".into()));
            }
            self.bools.push((key.to_string(), value));
            Ok(())
        }
    }

    #[test]
    fn publishes_both_keys() {
        let mut publisher = TelemetryPublisher::new(Recorder::default());
        assert!(publisher.publish(-0.25, false));

        let channel = publisher.channel();
        assert_eq!(channel.numbers, vec![(ANGLE_TO_TURN.to_string(), -0.25)]);
        assert_eq!(channel.bools, vec![(IS_ALIGNED.to_string(), false)]);
        assert_eq!(publisher.sent(), 1);
    }

    #[test]
    fn failures_are_swallowed_and_retried() {
        let mut publisher = TelemetryPublisher::new(Recorder {
            down: true,
            ..Default::default()
        });
        assert!(!publisher.publish(0.1, true));
        assert!(!publisher.publish(0.1, true));
        assert_eq!(publisher.failed(), 2);

        publisher.channel.down = false;
        assert!(publisher.publish(0.0, true));
        assert_eq!(publisher.sent(), 1);
    }

    #[test]
    fn missing_serial_port_is_not_fatal() {
        let mut publisher =
            TelemetryPublisher::new(SerialChannel::new("/dev/does-not-exist-turret", 115_200));
        assert!(!publisher.publish(0.5, false));
        assert!(!publisher.publish(0.5, false));
        assert_eq!(publisher.failed(), 2);
    }

    #[test]
    fn boxed_channels_forward() {
        let mut publisher: TelemetryPublisher<Box<dyn TelemetryChannel>> =
            TelemetryPublisher::new(Box::new(LogChannel));
        assert!(publisher.publish(0.0, true));
    }
}
