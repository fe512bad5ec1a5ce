//! Stateful packet decoder.
//!
//! Wraps decryption, field extraction, RPM smoothing and acceleration
//! tracking. Owned by the receive thread; one decoder per client.

use crate::frame::{RaceFlags, TelemetryFrame};
use crate::protocol::{
    FLAG_LOADING, FLAG_ON_TRACK, FLAG_PAUSED, FLAG_REV_LIMIT, OFF_BEST_LAP_MS, OFF_BRAKE,
    OFF_ENGINE_RPM, OFF_FLAGS, OFF_GEAR, OFF_LAP, OFF_LAST_LAP_MS, OFF_MAX_RPM,
    OFF_ORIENTATION_NORTH, OFF_POSITION, OFF_RACE_POSITION, OFF_ROTATION, OFF_SHIFT_RPM,
    OFF_SPEED_MS, OFF_SUSPENSION, OFF_THROTTLE, OFF_TOTAL_CARS, OFF_TOTAL_LAPS, OFF_TYRE_TEMP,
    OFF_VELOCITY, OFF_WHEEL_RADIUS, OFF_WHEEL_SPEED, PACKET_SIZE, decrypt_into, read_f32_le,
    read_f32x4_le, read_i16_le, read_i32_le, read_u8, read_u16_le,
};
use crate::smoothing::{AccelerationTracker, RpmSmoother};
use std::time::Duration;

/// Decodes raw GT7 datagrams into [`TelemetryFrame`]s.
#[derive(Debug)]
pub struct Gt7Decoder {
    scratch: Vec<u8>,
    rpm: RpmSmoother,
    accel: AccelerationTracker,
}

impl Default for Gt7Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Gt7Decoder {
    /// Create a decoder with empty smoothing history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scratch: Vec::with_capacity(PACKET_SIZE),
            rpm: RpmSmoother::new(),
            accel: AccelerationTracker::new(),
        }
    }

    /// Decode a packet stamped with the current monotonic time.
    pub fn decode(&mut self, packet: &[u8]) -> Option<TelemetryFrame> {
        self.decode_at(packet, crate::telemetry_now_ns())
    }

    /// Decode a packet with an explicit arrival time.
    ///
    /// Returns `None` for undersized packets or a magic mismatch after
    /// decryption. Smoothing state only advances for accepted packets.
    pub fn decode_at(&mut self, packet: &[u8], now_ns: u64) -> Option<TelemetryFrame> {
        if !decrypt_into(packet, &mut self.scratch) {
            return None;
        }
        Some(self.parse(now_ns))
    }

    fn parse(&mut self, now_ns: u64) -> TelemetryFrame {
        let buf = self.scratch.as_slice();

        let flag_word = read_u16_le(buf, OFF_FLAGS);
        let flags = RaceFlags {
            on_track: flag_word & FLAG_ON_TRACK != 0,
            paused: flag_word & FLAG_PAUSED != 0,
            loading: flag_word & FLAG_LOADING != 0,
        };

        let position = read_vec3(buf, OFF_POSITION);
        let velocity = read_vec3(buf, OFF_VELOCITY);
        let yaw = heading(
            read_f32_le(buf, OFF_ROTATION + 4),
            read_f32_le(buf, OFF_ORIENTATION_NORTH),
        );

        let raw_rpm = read_f32_le(buf, OFF_ENGINE_RPM);
        let gear_byte = read_u8(buf, OFF_GEAR);
        let wheel_speed = read_f32x4_le(buf, OFF_WHEEL_SPEED).map(f32::abs);

        let mut frame = TelemetryFrame {
            timestamp_ns: now_ns,
            flags,
            lap: read_i16_le(buf, OFF_LAP),
            total_laps: read_i16_le(buf, OFF_TOTAL_LAPS),
            best_lap: lap_time(read_i32_le(buf, OFF_BEST_LAP_MS)),
            last_lap: lap_time(read_i32_le(buf, OFF_LAST_LAP_MS)),
            race_position: read_i16_le(buf, OFF_RACE_POSITION),
            total_cars: read_i16_le(buf, OFF_TOTAL_CARS),
            position,
            velocity,
            yaw,
            raw_rpm,
            rpm: raw_rpm,
            shift_rpm: read_u16_le(buf, OFF_SHIFT_RPM),
            max_rpm: read_u16_le(buf, OFF_MAX_RPM),
            speed_kmh: read_f32_le(buf, OFF_SPEED_MS) * 3.6,
            gear: gear_byte & 0x0F,
            suggested_gear: gear_byte >> 4,
            throttle: f32::from(read_u8(buf, OFF_THROTTLE)) / 255.0 * 100.0,
            brake: f32::from(read_u8(buf, OFF_BRAKE)) / 255.0 * 100.0,
            rev_limiter: flag_word & FLAG_REV_LIMIT != 0,
            tyre_temp: read_f32x4_le(buf, OFF_TYRE_TEMP),
            wheel_speed,
            wheel_radius: read_f32x4_le(buf, OFF_WHEEL_RADIUS),
            suspension: read_f32x4_le(buf, OFF_SUSPENSION),
            surge_g: 0.0,
            sway_g: 0.0,
        };

        frame.rpm = self.rpm.push(raw_rpm);
        let (surge, sway) = self.accel.update(velocity, yaw, now_ns);
        frame.surge_g = surge;
        frame.sway_g = sway;
        frame
    }

    /// Forget smoothing history, e.g. after a long data gap.
    pub fn reset(&mut self) {
        self.rpm.reset();
        self.accel = AccelerationTracker::new();
    }
}

fn read_vec3(buf: &[u8], offset: usize) -> [f32; 3] {
    [
        read_f32_le(buf, offset),
        read_f32_le(buf, offset + 4),
        read_f32_le(buf, offset + 8),
    ]
}

/// Heading from the vertical quaternion component and its scalar part.
fn heading(q_y: f32, q_w: f32) -> f32 {
    let yaw = 2.0 * q_y.atan2(q_w);
    if yaw.is_finite() { yaw } else { 0.0 }
}

fn lap_time(ms: i32) -> Option<Duration> {
    u64::try_from(ms)
        .ok()
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encrypt_packet;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn plaintext() -> Vec<u8> {
        let mut buf = vec![0u8; PACKET_SIZE];
        buf[..4].copy_from_slice(b"0S7G");
        buf
    }

    fn put_f32(buf: &mut [u8], off: usize, v: f32) {
        buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
    }

    #[test]
    fn test_short_packet_rejected() {
        let mut decoder = Gt7Decoder::new();
        assert!(decoder.decode_at(&[0u8; PACKET_SIZE - 1], 0).is_none());
    }

    #[test]
    fn test_garbage_packet_rejected() {
        let mut decoder = Gt7Decoder::new();
        assert!(decoder.decode_at(&[0u8; PACKET_SIZE], 0).is_none());
    }

    #[test]
    fn test_fields_decoded() -> TestResult {
        let mut plain = plaintext();
        put_f32(&mut plain, OFF_SPEED_MS, 50.0);
        put_f32(&mut plain, OFF_ENGINE_RPM, 6500.0);
        plain[OFF_GEAR] = 0x43;
        plain[OFF_THROTTLE] = 255;
        plain[OFF_BRAKE] = 0;
        plain[OFF_FLAGS..OFF_FLAGS + 2]
            .copy_from_slice(&(FLAG_ON_TRACK | FLAG_REV_LIMIT).to_le_bytes());
        plain[OFF_MAX_RPM..OFF_MAX_RPM + 2].copy_from_slice(&8000u16.to_le_bytes());
        plain[OFF_BEST_LAP_MS..OFF_BEST_LAP_MS + 4].copy_from_slice(&(-1i32).to_le_bytes());
        plain[OFF_LAST_LAP_MS..OFF_LAST_LAP_MS + 4].copy_from_slice(&90_500i32.to_le_bytes());
        put_f32(&mut plain, OFF_WHEEL_SPEED, -120.0);

        let mut decoder = Gt7Decoder::new();
        let frame = decoder
            .decode_at(&encrypt_packet(&plain, 99), 0)
            .ok_or("frame")?;

        assert!((frame.speed_kmh - 180.0).abs() < 1e-3);
        assert!((frame.raw_rpm - 6500.0).abs() < 1e-3);
        assert_eq!(frame.gear, 3);
        assert_eq!(frame.suggested_gear, 4);
        assert!((frame.throttle - 100.0).abs() < 1e-3);
        assert!(frame.flags.on_track);
        assert!(!frame.flags.paused);
        assert!(frame.rev_limiter);
        assert_eq!(frame.max_rpm, 8000);
        assert_eq!(frame.best_lap, None);
        assert_eq!(frame.last_lap, Some(Duration::from_millis(90_500)));
        assert!((frame.wheel_speed[0] - 120.0).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn test_rpm_is_smoothed_across_packets() -> TestResult {
        let mut decoder = Gt7Decoder::new();
        let mut last = None;
        for (i, rpm) in [1000.0f32, 2000.0, 3000.0].into_iter().enumerate() {
            let mut plain = plaintext();
            put_f32(&mut plain, OFF_ENGINE_RPM, rpm);
            let packet = encrypt_packet(&plain, i as u32);
            last = decoder.decode_at(&packet, i as u64 * 16_000_000);
        }
        let frame = last.ok_or("frame")?;
        assert!((frame.rpm - 2000.0).abs() < 1e-3);
        assert!((frame.raw_rpm - 3000.0).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn test_heading_identity_quaternion_is_zero() {
        assert!(heading(0.0, 1.0).abs() < f32::EPSILON);
        let half_turn = heading(1.0, 0.0);
        assert!((half_turn - std::f32::consts::PI).abs() < 1e-5);
    }
}
