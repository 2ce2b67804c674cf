//! Fixed binary frames exchanged with range-finder clients.
//!
//! Every field is a 16-bit word in network (big-endian) byte order. Angles
//! are expressed in centidegrees and ranges in millimeters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of range words a data frame carries.
pub const MAX_SAMPLES: usize = 401;
/// Size of a config frame in bytes.
pub const CONFIG_FRAME_LEN: usize = 8;
/// Size of a data frame in bytes.
pub const DATA_FRAME_LEN: usize = DATA_HEADER_LEN + 2 * MAX_SAMPLES;

const DATA_HEADER_LEN: usize = 8;

/// Bits of a range word holding the range when reflectance reporting is on.
pub const RANGE_MASK: u16 = 0x1fff;
/// Position of the reflectance code within a range word.
pub const REFLECTANCE_SHIFT: u32 = 13;

pub fn centidegrees_to_radians(cdeg: i32) -> f64 {
    (f64::from(cdeg) / 100.0).to_radians()
}

/// A configuration request, as written by a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConfigRequest {
    /// Angular resolution in centidegrees.
    pub resolution: u16,
    /// First bearing in centidegrees.
    pub min_angle: i16,
    /// Last bearing in centidegrees.
    pub max_angle: i16,
    /// Report reflectance in the top bits of each range word.
    #[serde(default)]
    pub reflectance: bool,
}

impl ConfigRequest {
    pub fn encode(&self) -> [u8; CONFIG_FRAME_LEN] {
        let mut frame = [0; CONFIG_FRAME_LEN];
        frame[0..2].copy_from_slice(&self.resolution.to_be_bytes());
        frame[2..4].copy_from_slice(&self.min_angle.to_be_bytes());
        frame[4..6].copy_from_slice(&self.max_angle.to_be_bytes());
        frame[6..8].copy_from_slice(&u16::from(self.reflectance).to_be_bytes());
        frame
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_len(frame, CONFIG_FRAME_LEN)?;
        Ok(Self {
            resolution: read_u16(frame, 0),
            min_angle: read_i16(frame, 2),
            max_angle: read_i16(frame, 4),
            reflectance: read_u16(frame, 6) != 0,
        })
    }
}

/// A published scan, as read by a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaserData {
    /// Angular resolution in centidegrees.
    pub resolution: u16,
    /// First bearing in centidegrees.
    pub min_angle: i16,
    /// Last bearing in centidegrees.
    pub max_angle: i16,
    /// One word per sample; see [`encode_range`].
    pub ranges: Vec<u16>,
}

impl LaserData {
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.ranges.len() > MAX_SAMPLES {
            return Err(Error::CapacityExceeded {
                sample_count: self.ranges.len(),
                capacity: MAX_SAMPLES,
            });
        }
        let mut frame = Vec::with_capacity(DATA_FRAME_LEN);
        frame.extend_from_slice(&(self.ranges.len() as u16).to_be_bytes());
        frame.extend_from_slice(&self.resolution.to_be_bytes());
        frame.extend_from_slice(&self.min_angle.to_be_bytes());
        frame.extend_from_slice(&self.max_angle.to_be_bytes());
        for word in &self.ranges {
            frame.extend_from_slice(&word.to_be_bytes());
        }
        frame.resize(DATA_FRAME_LEN, 0);
        Ok(frame)
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_len(frame, DATA_FRAME_LEN)?;
        let sample_count = usize::from(read_u16(frame, 0));
        if sample_count > MAX_SAMPLES {
            return Err(Error::CapacityExceeded {
                sample_count,
                capacity: MAX_SAMPLES,
            });
        }
        Ok(Self {
            resolution: read_u16(frame, 2),
            min_angle: read_i16(frame, 4),
            max_angle: read_i16(frame, 6),
            ranges: (0..sample_count)
                .map(|i| read_u16(frame, DATA_HEADER_LEN + 2 * i))
                .collect(),
        })
    }

    /// Range (meters) and reflectance code of every sample.
    pub fn samples(&self, reflectance: bool) -> impl Iterator<Item = (f64, u8)> + '_ {
        self.ranges
            .iter()
            .map(move |&word| decode_range(word, reflectance))
    }
}

/// Packs a range (meters) into a millimeter word. With reflectance reporting
/// on, the range saturates at [`RANGE_MASK`] and the code sits in the top bits.
pub fn encode_range(range: f64, reflectant: bool, reflectance: bool) -> u16 {
    let mm = (range * 1000.0) as u16;
    if reflectance {
        (mm.min(RANGE_MASK)) | (u16::from(reflectant) << REFLECTANCE_SHIFT)
    } else {
        mm
    }
}

pub fn decode_range(word: u16, reflectance: bool) -> (f64, u8) {
    if reflectance {
        (
            f64::from(word & RANGE_MASK) / 1000.0,
            (word >> REFLECTANCE_SHIFT) as u8,
        )
    } else {
        (f64::from(word) / 1000.0, 0)
    }
}

fn check_len(frame: &[u8], expected: usize) -> Result<()> {
    if frame.len() == expected {
        Ok(())
    } else {
        Err(Error::WireLength {
            expected,
            actual: frame.len(),
        })
    }
}

fn read_u16(frame: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([frame[at], frame[at + 1]])
}

fn read_i16(frame: &[u8], at: usize) -> i16 {
    i16::from_be_bytes([frame[at], frame[at + 1]])
}
