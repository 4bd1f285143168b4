use byteorder::{ByteOrder, LittleEndian};
use rhx_types::{RhxError, RhxResult};

/// Little-endian читатель поверх среза с проверкой границ.
///
/// Каждое чтение сдвигает позицию на ширину поля. Если байт не хватает,
/// возвращается `OutOfBounds`, а позиция не меняется.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    base_offset: u64,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_base_offset(buf, 0)
    }

    /// Курсор, у которого `buf[0]` лежит на `base_offset` от начала потока.
    /// Смещения в ошибках считаются от начала потока.
    pub fn with_base_offset(
        buf: &'a [u8],
        base_offset: u64,
    ) -> Self {
        Self {
            buf,
            pos: 0,
            base_offset,
        }
    }

    /// Позиция относительно начала среза.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Позиция относительно начала потока.
    pub fn stream_offset(&self) -> u64 {
        self.base_offset + self.pos as u64
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(
        &mut self,
        n: usize,
    ) -> RhxResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(RhxError::OutOfBounds {
                offset: self.stream_offset(),
                needed: n,
                available: self.remaining(),
            });
        }

        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;

        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> RhxResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> RhxResult<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub fn read_u32_le(&mut self) -> RhxResult<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }

    pub fn read_i32_le(&mut self) -> RhxResult<i32> {
        self.take(4).map(LittleEndian::read_i32)
    }

    /// Читает `n` байт поля фиксированной длины (ASCII), без проверки
    /// содержимого.
    pub fn read_fixed_ascii(
        &mut self,
        n: usize,
    ) -> RhxResult<&'a [u8]> {
        self.take(n)
    }

    /// То же, что [`read_fixed_ascii`](Self::read_fixed_ascii), но в массив
    /// известной длины.
    pub fn read_array<const N: usize>(&mut self) -> RhxResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
