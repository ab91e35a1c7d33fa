// IrqLab - Interrupt Injection Sandbox
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host-side model of the second demo program: poll an HTU21D-style
//! temperature/humidity sensor on a fixed period and paint the readings to a
//! small text panel. Protocol fidelity is out of scope; the sensor and the
//! panel are narrow capability interfaces with in-memory implementations.

use crate::mainloop::LoopControl;
use crate::Clock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One environment sample.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Reading {
    pub temperature_c: f32,
    pub relative_humidity: f32,
}

/// Sensor fault taxonomy, mirroring the HTU21D driver status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("bus transfer error")]
    TransferError,
    #[error("reading failed checksum validation")]
    CrcError,
}

pub trait SensorSource: Send {
    fn sample(&self) -> Result<Reading, SensorError>;
}

/// Line-oriented display sink. Fire-and-forget, like the LCD GUI calls in
/// the original demo.
pub trait DisplaySink: Send + Sync {
    fn paint(&self, lines: &[String]);
}

/// Deterministic waveform generator standing in for the real sensor.
///
/// Produces a slow triangle wave around fixed base values so consecutive
/// frames visibly change. Individual samples can be scripted to fail.
#[derive(Debug, Default)]
pub struct SyntheticSensor {
    step: AtomicU64,
    faults: Mutex<HashMap<u64, SensorError>>,
}

impl SyntheticSensor {
    const BASE_TEMPERATURE_C: f32 = 23.4;
    const BASE_HUMIDITY: f32 = 48.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Script the sample at index `step` to fail with `error`.
    pub fn fail_at(&self, step: u64, error: SensorError) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(step, error);
    }

    fn wave(step: u64, period: u64, amplitude: f32) -> f32 {
        let phase = step % period;
        let half = period / 2;
        let distance = if phase < half { phase } else { period - phase };
        amplitude * distance as f32 / half as f32
    }
}

impl SensorSource for SyntheticSensor {
    fn sample(&self) -> Result<Reading, SensorError> {
        let step = self.step.fetch_add(1, Ordering::Relaxed);
        let fault = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&step)
            .copied();
        if let Some(error) = fault {
            return Err(error);
        }
        Ok(Reading {
            temperature_c: Self::BASE_TEMPERATURE_C + Self::wave(step, 8, 1.5),
            relative_humidity: Self::BASE_HUMIDITY + Self::wave(step, 12, 4.0),
        })
    }
}

/// Text panel retaining the last painted frame, standing in for the 1.8"
/// TFT of the original board.
#[derive(Debug, Default)]
pub struct TextPanel {
    frame: Mutex<Vec<String>>,
    frames_painted: AtomicU64,
}

impl TextPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Vec<String> {
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn frames_painted(&self) -> u64 {
        self.frames_painted.load(Ordering::Relaxed)
    }
}

impl DisplaySink for TextPanel {
    fn paint(&self, lines: &[String]) {
        for line in lines {
            tracing::info!(panel = %line);
        }
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = lines.to_vec();
        self.frames_painted.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome summary of a finished sensor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SensorReport {
    pub samples: u64,
    pub frames_painted: u64,
    pub transfer_errors: u64,
    pub crc_errors: u64,
}

/// Polls the sensor each period and paints the readings.
///
/// Same cooperative model as the interrupt demo loop: bounded by
/// `max_samples` or stopped through the cloneable control handle. A failed
/// sample skips the frame for that period, as the original skips its printf.
pub struct SensorLoop<S: SensorSource, C: Clock> {
    sensor: S,
    display: Arc<dyn DisplaySink>,
    clock: C,
    period: Duration,
    control: LoopControl,
}

impl<S: SensorSource, C: Clock> SensorLoop<S, C> {
    pub fn new(sensor: S, display: Arc<dyn DisplaySink>, clock: C, period: Duration) -> Self {
        Self {
            sensor,
            display,
            clock,
            period,
            control: LoopControl::new(),
        }
    }

    pub fn control(&self) -> LoopControl {
        self.control.clone()
    }

    pub fn run(&mut self, max_samples: Option<u64>) -> SensorReport {
        let mut report = SensorReport::default();
        loop {
            if self.control.is_stopped() {
                tracing::info!("sensor loop stopped by control handle");
                break;
            }
            if let Some(max) = max_samples {
                if report.samples >= max {
                    break;
                }
            }

            match self.sensor.sample() {
                Ok(reading) => {
                    let lines = vec![
                        format!("Temp: {:5.2} degC", reading.temperature_c),
                        format!("Humi: {:4.1} %", reading.relative_humidity),
                    ];
                    self.display.paint(&lines);
                    report.frames_painted += 1;
                }
                Err(SensorError::TransferError) => {
                    report.transfer_errors += 1;
                    tracing::warn!("sensor transfer error");
                }
                Err(SensorError::CrcError) => {
                    report.crc_errors += 1;
                    tracing::warn!("sensor CRC error");
                }
            }
            report.samples += 1;
            self.clock.delay(self.period);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ManualClock;

    #[test]
    fn test_every_good_sample_paints_a_frame() {
        let panel = Arc::new(TextPanel::new());
        let mut sensor_loop = SensorLoop::new(
            SyntheticSensor::new(),
            panel.clone(),
            ManualClock::new(),
            Duration::from_millis(100),
        );

        let report = sensor_loop.run(Some(5));
        assert_eq!(report.samples, 5);
        assert_eq!(report.frames_painted, 5);
        assert_eq!(panel.frames_painted(), 5);
        assert_eq!(report.transfer_errors, 0);
    }

    #[test]
    fn test_faulted_sample_skips_frame_and_counts() {
        let sensor = SyntheticSensor::new();
        sensor.fail_at(1, SensorError::TransferError);
        sensor.fail_at(3, SensorError::CrcError);
        let panel = Arc::new(TextPanel::new());
        let mut sensor_loop = SensorLoop::new(
            sensor,
            panel.clone(),
            ManualClock::new(),
            Duration::from_millis(100),
        );

        let report = sensor_loop.run(Some(4));
        assert_eq!(report.samples, 4);
        assert_eq!(report.frames_painted, 2);
        assert_eq!(report.transfer_errors, 1);
        assert_eq!(report.crc_errors, 1);
    }

    #[test]
    fn test_frame_format_matches_demo_layout() {
        let panel = Arc::new(TextPanel::new());
        let mut sensor_loop = SensorLoop::new(
            SyntheticSensor::new(),
            panel.clone(),
            ManualClock::new(),
            Duration::from_millis(100),
        );
        sensor_loop.run(Some(1));

        let frame = panel.last_frame();
        assert_eq!(frame.len(), 2);
        assert!(frame[0].starts_with("Temp: "), "got {}", frame[0]);
        assert!(frame[0].ends_with(" degC"));
        assert!(frame[1].starts_with("Humi: "));
        assert!(frame[1].ends_with(" %"));
    }

    #[test]
    fn test_synthetic_sensor_wave_is_deterministic() {
        let a = SyntheticSensor::new();
        let b = SyntheticSensor::new();
        for _ in 0..10 {
            assert_eq!(a.sample().unwrap(), b.sample().unwrap());
        }
    }

    #[test]
    fn test_stop_handle_ends_unbounded_run() {
        use crate::mainloop::LoopControl;
        use std::sync::atomic::{AtomicU64, Ordering};

        // Clock that fires the stop handle after a fixed number of periods,
        // the only hook an unbounded sensor run exposes per sample.
        #[derive(Debug, Default)]
        struct StoppingClock {
            control: Mutex<Option<LoopControl>>,
            after: AtomicU64,
            calls: AtomicU64,
        }
        impl StoppingClock {
            fn arm(&self, control: LoopControl, after: u64) {
                *self.control.lock().unwrap() = Some(control);
                self.after.store(after, Ordering::Relaxed);
            }
        }
        impl Clock for StoppingClock {
            fn delay(&self, _duration: Duration) {
                let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
                if calls >= self.after.load(Ordering::Relaxed) {
                    if let Some(control) = &*self.control.lock().unwrap() {
                        control.stop();
                    }
                }
            }
        }

        let clock = Arc::new(StoppingClock::default());
        let panel = Arc::new(TextPanel::new());
        let mut sensor_loop = SensorLoop::new(
            SyntheticSensor::new(),
            panel,
            clock.clone(),
            Duration::from_millis(100),
        );
        clock.arm(sensor_loop.control(), 3);

        let report = sensor_loop.run(None);
        assert_eq!(report.samples, 3);
        assert_eq!(report.frames_painted, 3);
    }

    #[test]
    fn test_one_delay_per_sample() {
        let clock = Arc::new(ManualClock::new());
        let panel = Arc::new(TextPanel::new());
        let mut sensor_loop = SensorLoop::new(
            SyntheticSensor::new(),
            panel,
            clock.clone(),
            Duration::from_secs(1),
        );
        sensor_loop.run(Some(3));
        assert_eq!(clock.delay_count(), 3);
    }
}
