// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Packing of instance ids into 4-channel pick colors.
//!
//! Ids are stored little-endian: red holds the lowest byte, alpha the
//! highest. Backends writing an id buffer must use the same packing so that
//! a sampled pixel decodes back to the id that produced it.

use bytemuck::{Pod, Zeroable};

/// An id packed into an RGBA8 color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct IdColor(pub [u8; 4]);

impl IdColor {
    /// The color of pixels no primitive covered.
    pub const BACKGROUND: Self = Self([0; 4]);

    /// Packs `id` into a color.
    pub const fn encode(id: u32) -> Self {
        Self(id.to_le_bytes())
    }

    /// Recovers the id stored in this color.
    pub const fn decode(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Normalized float channels, as written to a floating point target.
    pub fn to_float(self) -> [f32; 4] {
        self.0.map(|c| c as f32 / 255.0)
    }

    /// Rebuilds a color from normalized float channels.
    ///
    /// Channels are rounded to the nearest byte and clamped to `[0, 1]`.
    pub fn from_float(channels: [f32; 4]) -> Self {
        Self(channels.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
    }

    /// Integer channels, as written to a signed integer target.
    pub fn to_ivec(self) -> [i32; 4] {
        self.0.map(i32::from)
    }

    /// Rebuilds a color from integer channels, keeping the low byte of each.
    pub fn from_ivec(channels: [i32; 4]) -> Self {
        Self(channels.map(|c| (c & 0xff) as u8))
    }
}

impl From<u32> for IdColor {
    fn from(id: u32) -> Self {
        Self::encode(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_channel_order_is_little_endian() {
        let color = IdColor::encode(0x0403_0201);
        assert_eq!(color.0, [1, 2, 3, 4]);
        assert_eq!(color.decode(), 0x0403_0201);
    }

    #[test]
    fn test_background_decodes_to_zero() {
        assert_eq!(IdColor::BACKGROUND.decode(), 0);
    }

    #[test]
    fn test_float_channels_survive_quantization() {
        let color = IdColor::encode(0x00ab_cdef);
        let floats = color.to_float();
        assert_relative_eq!(floats[0], 0xef as f32 / 255.0);
        assert_relative_eq!(floats[3], 0.0);
        assert_eq!(IdColor::from_float(floats), color);
    }

    #[test]
    fn test_ivec_channels() {
        let color = IdColor::encode(0xff00_7f01);
        assert_eq!(color.to_ivec(), [1, 0x7f, 0, 0xff]);
        assert_eq!(IdColor::from_ivec(color.to_ivec()), color);
    }

    #[test]
    fn test_bytes_cast() {
        let colors = [IdColor::encode(1), IdColor::encode(2)];
        let bytes: &[u8] = bytemuck::cast_slice(&colors);
        assert_eq!(bytes, &[1, 0, 0, 0, 2, 0, 0, 0]);
    }
}
