/// A decoded image: contiguous RGB bytes in row-major order.
///
/// Decoding happens at the encoder boundary only; everything downstream
/// of the encoder sees signatures, never pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

pub const CHANNELS: usize = 3;

impl Frame {
    /// Returns `None` when `data` does not hold exactly `width * height` RGB pixels
    /// or either dimension is zero.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * CHANNELS;
        if width == 0 || height == 0 || data.len() != expected {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGB value at column `x`, row `y`. Coordinates are clamped to the frame.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let x = x.min(self.width as usize - 1);
        let y = y.min(self.height as usize - 1);
        let offset = (y * self.width as usize + x) * CHANNELS;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    /// Copies the box `[x1, y1, x2, y2)` clamped to frame bounds.
    ///
    /// Returns `None` if the clamped box is empty.
    pub fn crop(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> Option<Frame> {
        let fw = self.width as f64;
        let fh = self.height as f64;
        let left = x1.clamp(0.0, fw).floor() as u32;
        let top = y1.clamp(0.0, fh).floor() as u32;
        let right = x2.clamp(0.0, fw).ceil() as u32;
        let bottom = y2.clamp(0.0, fh).ceil() as u32;
        if right <= left || bottom <= top {
            return None;
        }

        let crop_w = right - left;
        let crop_h = bottom - top;
        let row_bytes = crop_w as usize * CHANNELS;
        let mut data = Vec::with_capacity(row_bytes * crop_h as usize);
        for row in top..bottom {
            let start = (row as usize * self.width as usize + left as usize) * CHANNELS;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Frame::new(data, crop_w, crop_h)
    }
}
