use std::time::Duration;

use crate::GrayImage;

/// Errors produced while validating an input frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("unsupported channel count {channels} (expected 1, 3 or 4)")]
    UnsupportedChannels { channels: usize },

    #[error("invalid frame buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
}

/// One camera frame: interleaved 8-bit samples plus the capture timestamp.
///
/// Supported layouts are gray (1 channel), RGB (3) and RGBA (4).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
    pub timestamp: Duration,
}

impl Frame {
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
        timestamp: Duration,
    ) -> Self {
        Self {
            width,
            height,
            channels,
            data,
            timestamp,
        }
    }

    /// Single-channel frame wrapping an owned gray image.
    pub fn from_gray(image: GrayImage, timestamp: Duration) -> Self {
        Self {
            width: image.width,
            height: image.height,
            channels: 1,
            data: image.data,
            timestamp,
        }
    }

    /// Check dimensions, channel layout and buffer length.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(FrameError::UnsupportedChannels {
                channels: self.channels,
            });
        }
        let expected = self.width * self.height * self.channels;
        if self.data.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    /// Validate and convert to luma (BT.601 integer weights, alpha ignored).
    pub fn to_gray(&self) -> Result<GrayImage, FrameError> {
        self.validate()?;
        let data = if self.channels == 1 {
            self.data.clone()
        } else {
            self.data
                .chunks_exact(self.channels)
                .map(|px| {
                    let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
                    ((77 * r + 150 * g + 29 * b) >> 8) as u8
                })
                .collect()
        };
        Ok(GrayImage {
            width: self.width,
            height: self.height,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_frames() {
        let ts = Duration::ZERO;
        assert_eq!(
            Frame::new(0, 4, 1, vec![], ts).to_gray(),
            Err(FrameError::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
        assert_eq!(
            Frame::new(2, 2, 2, vec![0; 8], ts).to_gray(),
            Err(FrameError::UnsupportedChannels { channels: 2 })
        );
        assert_eq!(
            Frame::new(2, 2, 3, vec![0; 11], ts).to_gray(),
            Err(FrameError::InvalidBuffer {
                expected: 12,
                got: 11
            })
        );
    }

    #[test]
    fn converts_color_to_luma() {
        let rgb = vec![255, 255, 255, 0, 0, 0, 255, 0, 0];
        let gray = Frame::new(3, 1, 3, rgb, Duration::from_millis(5))
            .to_gray()
            .unwrap();
        assert_eq!(gray.data, vec![255, 0, 76]);

        let rgba = vec![10, 10, 10, 0];
        let gray = Frame::new(1, 1, 4, rgba, Duration::ZERO).to_gray().unwrap();
        assert_eq!(gray.data, vec![10]);
    }
}
