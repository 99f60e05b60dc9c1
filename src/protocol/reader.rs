use crate::error::ReadError;

/// Bounds-checked forward-only cursor over a single command's byte buffer.
///
/// Every primitive read first verifies the requested span lies within the
/// remaining buffer; a violation returns [`ReadError::Underrun`] and the
/// cursor position is left unchanged, so a failed command never
/// partially-applies.
pub struct ByteReader<'b> {
    buffer: &'b [u8],
    position: usize,
}

impl<'b> ByteReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    fn take(&mut self, count: usize) -> Result<&'b [u8], ReadError> {
        if count > self.remaining() {
            return Err(ReadError::Underrun {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let span = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(span)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        let span = self.take(2)?;
        Ok(u16::from_le_bytes([span[0], span[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        let span = self.take(4)?;
        Ok(u32::from_le_bytes([span[0], span[1], span[2], span[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, ReadError> {
        let span = self.take(4)?;
        Ok(i32::from_le_bytes([span[0], span[1], span[2], span[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, ReadError> {
        let span = self.take(4)?;
        Ok(f32::from_le_bytes([span[0], span[1], span[2], span[3]]))
    }

    pub fn read_i32_2(&mut self) -> Result<[i32; 2], ReadError> {
        Ok([self.read_i32()?, self.read_i32()?])
    }

    pub fn read_i32_3(&mut self) -> Result<[i32; 3], ReadError> {
        Ok([self.read_i32()?, self.read_i32()?, self.read_i32()?])
    }

    pub fn read_i32_4(&mut self) -> Result<[i32; 4], ReadError> {
        Ok([
            self.read_i32()?,
            self.read_i32()?,
            self.read_i32()?,
            self.read_i32()?,
        ])
    }

    pub fn read_f32_3(&mut self) -> Result<[f32; 3], ReadError> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }

    pub fn read_i32s(&mut self, count: usize) -> Result<Vec<i32>, ReadError> {
        // Check the whole span up front so a short buffer fails before
        // any element is consumed.
        if count * 4 > self.remaining() {
            return Err(ReadError::Underrun {
                needed: count * 4,
                remaining: self.remaining(),
            });
        }
        let mut vals = Vec::with_capacity(count);
        for _ in 0..count {
            vals.push(self.read_i32()?);
        }
        Ok(vals)
    }

    pub fn read_f32s(&mut self, count: usize) -> Result<Vec<f32>, ReadError> {
        if count * 4 > self.remaining() {
            return Err(ReadError::Underrun {
                needed: count * 4,
                remaining: self.remaining(),
            });
        }
        let mut vals = Vec::with_capacity(count);
        for _ in 0..count {
            vals.push(self.read_f32()?);
        }
        Ok(vals)
    }

    /// Reads `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], ReadError> {
        self.take(count)
    }

    /// Reads a 4-byte length followed by that many UTF-8 bytes. The length
    /// is bound-checked against the remaining buffer before copying.
    pub fn read_string(&mut self) -> Result<String, ReadError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(ReadError::NegativeLength(len));
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ReadError::InvalidUtf8)
    }
}
