//! GT7 simulator-interface wire protocol.
//!
//! Packets are 296 bytes (0x128), encrypted with Salsa20 using a fixed key.
//! The 8-byte nonce comes from the 4-byte seed at `[0x40..0x44]` of the raw
//! packet: `iv1 = LE_u32(seed)`, `iv2 = iv1 ^ 0xDEADBEAF`, nonce =
//! `iv2_le ‖ iv1_le`. After decryption the first four bytes hold the magic
//! tag, which has been observed in both byte orders.
//!
//! All fields are little-endian at fixed offsets.

use salsa20::Salsa20;
use salsa20::cipher::{KeyIvInit, StreamCipher};

/// Local UDP port the console sends telemetry to.
pub const GT7_RECV_PORT: u16 = 33740;
/// Console UDP port that receives heartbeats.
pub const GT7_HEARTBEAT_PORT: u16 = 33739;
/// Heartbeat payload requesting the standard 296-byte packet.
pub const HEARTBEAT_PAYLOAD: &[u8] = b"A";
/// Minimum accepted packet size.
pub const PACKET_SIZE: usize = 0x128;
/// Receive buffer size; larger datagrams are truncated to this.
pub const MAX_DATAGRAM: usize = 4096;

/// First 32 bytes of `"Simulator Interface Packet GT7 ver 0.0"`.
pub const SALSA_KEY: [u8; 32] = *b"Simulator Interface Packet GT7 v";
/// Constant XORed into the nonce seed.
pub const NONCE_XOR: u32 = 0xDEAD_BEAF;
/// Offset of the 4-byte nonce seed in the raw packet.
pub const OFF_NONCE_SEED: usize = 0x40;

/// Accepted magic tags at decrypted offset 0.
pub const MAGIC_TAGS: [[u8; 4]; 2] = [*b"0S7G", *b"G7S0"];

pub(crate) const OFF_MAGIC: usize = 0x00;
pub(crate) const OFF_POSITION: usize = 0x04;
pub(crate) const OFF_VELOCITY: usize = 0x10;
pub(crate) const OFF_ROTATION: usize = 0x1C;
pub(crate) const OFF_ORIENTATION_NORTH: usize = 0x28;
pub(crate) const OFF_ENGINE_RPM: usize = 0x3C;
pub(crate) const OFF_SPEED_MS: usize = 0x4C;
pub(crate) const OFF_TYRE_TEMP: usize = 0x60;
pub(crate) const OFF_LAP: usize = 0x74;
pub(crate) const OFF_TOTAL_LAPS: usize = 0x76;
pub(crate) const OFF_BEST_LAP_MS: usize = 0x78;
pub(crate) const OFF_LAST_LAP_MS: usize = 0x7C;
pub(crate) const OFF_RACE_POSITION: usize = 0x84;
pub(crate) const OFF_TOTAL_CARS: usize = 0x86;
pub(crate) const OFF_SHIFT_RPM: usize = 0x88;
pub(crate) const OFF_MAX_RPM: usize = 0x8A;
pub(crate) const OFF_FLAGS: usize = 0x8E;
pub(crate) const OFF_GEAR: usize = 0x90;
pub(crate) const OFF_THROTTLE: usize = 0x91;
pub(crate) const OFF_BRAKE: usize = 0x92;
pub(crate) const OFF_WHEEL_SPEED: usize = 0xA4;
pub(crate) const OFF_WHEEL_RADIUS: usize = 0xB4;
pub(crate) const OFF_SUSPENSION: usize = 0xC4;

pub(crate) const FLAG_ON_TRACK: u16 = 1 << 0;
pub(crate) const FLAG_PAUSED: u16 = 1 << 1;
pub(crate) const FLAG_LOADING: u16 = 1 << 2;
pub(crate) const FLAG_REV_LIMIT: u16 = 1 << 5;

/// Derive the Salsa20 nonce from the raw packet.
///
/// Returns `None` if the packet is too short to carry the seed.
#[must_use]
pub fn derive_nonce(raw: &[u8]) -> Option<[u8; 8]> {
    let iv1 = raw
        .get(OFF_NONCE_SEED..OFF_NONCE_SEED + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)?;
    let iv2 = iv1 ^ NONCE_XOR;

    let mut nonce = [0u8; 8];
    let (lo, hi) = nonce.split_at_mut(4);
    lo.copy_from_slice(&iv2.to_le_bytes());
    hi.copy_from_slice(&iv1.to_le_bytes());
    Some(nonce)
}

/// XOR `buf` with the Salsa20 keystream for `nonce`.
///
/// The cipher is symmetric, so this both encrypts and decrypts.
pub fn apply_keystream(buf: &mut [u8], nonce: &[u8; 8]) {
    let mut cipher = Salsa20::new(&SALSA_KEY.into(), &(*nonce).into());
    cipher.apply_keystream(buf);
}

/// Decrypt a raw packet into `out` and verify its magic tag.
///
/// `out` is resized to the packet length. Returns `false` if the packet is
/// undersized or the decrypted tag does not match either accepted sequence.
pub fn decrypt_into(raw: &[u8], out: &mut Vec<u8>) -> bool {
    if raw.len() < PACKET_SIZE {
        return false;
    }
    let Some(nonce) = derive_nonce(raw) else {
        return false;
    };

    out.clear();
    out.extend_from_slice(raw);
    apply_keystream(out, &nonce);
    has_magic(out)
}

/// Check the decrypted magic tag.
#[must_use]
pub fn has_magic(decrypted: &[u8]) -> bool {
    decrypted
        .get(OFF_MAGIC..OFF_MAGIC + 4)
        .is_some_and(|tag| MAGIC_TAGS.iter().any(|m| m.as_slice() == tag))
}

// ---------------------------------------------------------------------------
// Low-level read helpers
// ---------------------------------------------------------------------------

pub(crate) fn read_f32_le(data: &[u8], offset: usize) -> f32 {
    let val = data
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map_or(0.0, f32::from_le_bytes);
    if val.is_finite() { val } else { 0.0 }
}

pub(crate) fn read_f32x4_le(data: &[u8], offset: usize) -> [f32; 4] {
    [
        read_f32_le(data, offset),
        read_f32_le(data, offset + 4),
        read_f32_le(data, offset + 8),
        read_f32_le(data, offset + 12),
    ]
}

pub(crate) fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    data.get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map_or(0, u16::from_le_bytes)
}

pub(crate) fn read_i16_le(data: &[u8], offset: usize) -> i16 {
    data.get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map_or(0, i16::from_le_bytes)
}

pub(crate) fn read_i32_le(data: &[u8], offset: usize) -> i32 {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map_or(0, i32::from_le_bytes)
}

pub(crate) fn read_u8(data: &[u8], offset: usize) -> u8 {
    data.get(offset).copied().unwrap_or(0)
}

/// Build an encrypted packet from a plaintext buffer.
///
/// Writes the nonce seed into the ciphertext after encryption, which is what
/// the console does. Used by tests and the loopback tooling.
#[must_use]
pub fn encrypt_packet(plaintext: &[u8], seed: u32) -> Vec<u8> {
    let mut seeded = plaintext.to_vec();
    if let Some(slot) = seeded.get_mut(OFF_NONCE_SEED..OFF_NONCE_SEED + 4) {
        slot.copy_from_slice(&seed.to_le_bytes());
    }
    let nonce = derive_nonce(&seeded).unwrap_or([0u8; 8]);
    apply_keystream(&mut seeded, &nonce);
    if let Some(slot) = seeded.get_mut(OFF_NONCE_SEED..OFF_NONCE_SEED + 4) {
        slot.copy_from_slice(&seed.to_le_bytes());
    }
    seeded
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_nonce_derivation_layout() -> TestResult {
        let mut raw = vec![0u8; PACKET_SIZE];
        raw[OFF_NONCE_SEED..OFF_NONCE_SEED + 4].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        let nonce = derive_nonce(&raw).ok_or("nonce")?;
        assert_eq!(nonce[..4], (0x1234_5678u32 ^ NONCE_XOR).to_le_bytes());
        assert_eq!(nonce[4..], 0x1234_5678u32.to_le_bytes());
        Ok(())
    }

    #[test]
    fn test_nonce_needs_seed_bytes() {
        assert!(derive_nonce(&[0u8; OFF_NONCE_SEED + 3]).is_none());
    }

    #[test]
    fn test_keystream_is_symmetric() -> TestResult {
        let nonce = [7u8; 8];
        let original: Vec<u8> = (0..PACKET_SIZE).map(|i| (i % 251) as u8).collect();
        let mut buf = original.clone();
        apply_keystream(&mut buf, &nonce);
        assert_ne!(buf, original);
        apply_keystream(&mut buf, &nonce);
        assert_eq!(buf, original);
        Ok(())
    }

    #[test]
    fn test_both_magic_orders_accepted() {
        let mut buf = vec![0u8; PACKET_SIZE];
        buf[..4].copy_from_slice(b"0S7G");
        assert!(has_magic(&buf));
        buf[..4].copy_from_slice(b"G7S0");
        assert!(has_magic(&buf));
        buf[..4].copy_from_slice(b"GT7!");
        assert!(!has_magic(&buf));
    }

    #[test]
    fn test_encrypt_then_decrypt_recovers_plaintext() -> TestResult {
        let mut plain = vec![0u8; PACKET_SIZE];
        plain[..4].copy_from_slice(b"0S7G");
        plain[OFF_SPEED_MS..OFF_SPEED_MS + 4].copy_from_slice(&42.5f32.to_le_bytes());

        let packet = encrypt_packet(&plain, 0xCAFE_F00D);
        let mut out = Vec::new();
        assert!(decrypt_into(&packet, &mut out));
        assert!((read_f32_le(&out, OFF_SPEED_MS) - 42.5).abs() < f32::EPSILON);
        Ok(())
    }

    #[test]
    fn test_read_helpers_out_of_range_are_zero() {
        let data = [0u8; 4];
        assert!(read_f32_le(&data, 2).abs() < f32::EPSILON);
        assert_eq!(read_u16_le(&data, 3), 0);
        assert_eq!(read_i32_le(&data, 1), 0);
        assert_eq!(read_u8(&data, 9), 0);
    }

    #[test]
    fn test_non_finite_float_reads_zero() {
        let data = f32::NAN.to_le_bytes();
        assert!(read_f32_le(&data, 0).abs() < f32::EPSILON);
        let data = f32::INFINITY.to_le_bytes();
        assert!(read_f32_le(&data, 0).abs() < f32::EPSILON);
    }
}
