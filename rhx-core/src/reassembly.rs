//! Сборка юнитов фиксированного размера из TCP потока.
//!
//! TCP доставляет байты, а не сообщения: один `read` может вернуть часть
//! блока, несколько блоков или кусок, пересекающий границу блока.
//! [`StreamReassembler`] копит байты и отдаёт только целые юниты, остаток
//! хранится до следующего `feed`.

use log::trace;
use rhx_types::{RhxError, RhxResult, StreamKind, TruncatedStreamWarning};

/// Накопитель одного потока.
#[derive(Debug)]
pub struct StreamReassembler {
    stream: StreamKind,
    unit_size: usize,
    carryover: Vec<u8>,
    bytes_fed: u64,
    units_emitted: u64,
}

/// Целые юниты, выделенные одним вызовом [`StreamReassembler::feed`].
///
/// Владеет байтами, поэтому может жить дольше заимствования реассемблера.
#[derive(Debug, Clone)]
pub struct CompleteUnits {
    data: Vec<u8>,
    unit_size: usize,
    first_offset: u64,
}

impl StreamReassembler {
    /// Создаёт накопитель с фиксированным размером юнита.
    ///
    /// Размер не меняется до конца жизни экземпляра: смена раскладки требует
    /// нового реассемблера.
    pub fn new(
        stream: StreamKind,
        unit_size: usize,
    ) -> RhxResult<Self> {
        if unit_size == 0 {
            return Err(RhxError::configuration("unit size must be > 0"));
        }

        Ok(Self {
            stream,
            unit_size,
            carryover: Vec::with_capacity(unit_size),
            bytes_fed: 0,
            units_emitted: 0,
        })
    }

    /// Добавляет `chunk` к остатку и отрезает все целые юниты.
    ///
    /// Меньше `unit_size` байт в наличии: пустой результат, не ошибка.
    pub fn feed(
        &mut self,
        chunk: &[u8],
    ) -> CompleteUnits {
        self.bytes_fed += chunk.len() as u64;
        self.carryover.extend_from_slice(chunk);

        let first_offset = self.units_emitted * self.unit_size as u64;
        let n_units = self.carryover.len() / self.unit_size;

        if n_units == 0 {
            return CompleteUnits {
                data: Vec::new(),
                unit_size: self.unit_size,
                first_offset,
            };
        }

        let complete = n_units * self.unit_size;

        let mut rest = Vec::with_capacity(self.unit_size);
        rest.extend_from_slice(&self.carryover[complete..]);
        self.carryover.truncate(complete);

        let data = std::mem::replace(&mut self.carryover, rest);
        self.units_emitted += n_units as u64;

        trace!(
            "{}: +{} bytes -> {} units, {} pending",
            self.stream,
            chunk.len(),
            n_units,
            self.carryover.len()
        );

        CompleteUnits {
            data,
            unit_size: self.unit_size,
            first_offset,
        }
    }

    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    pub fn unit_size(&self) -> usize {
        self.unit_size
    }

    /// Байт в остатке (всегда `< unit_size`).
    pub fn pending(&self) -> usize {
        self.carryover.len()
    }

    pub fn bytes_fed(&self) -> u64 {
        self.bytes_fed
    }

    pub fn units_emitted(&self) -> u64 {
        self.units_emitted
    }

    /// Завершает поток. Непустой остаток возвращается как предупреждение.
    pub fn finish(self) -> Option<TruncatedStreamWarning> {
        if self.carryover.is_empty() {
            return None;
        }

        Some(TruncatedStreamWarning {
            stream: self.stream,
            stream_offset: self.units_emitted * self.unit_size as u64,
            bytes: self.carryover,
        })
    }
}

impl CompleteUnits {
    /// Количество юнитов.
    pub fn len(&self) -> usize {
        self.data.len() / self.unit_size
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn unit_size(&self) -> usize {
        self.unit_size
    }

    /// Байты юнита `index`.
    pub fn get(
        &self,
        index: usize,
    ) -> Option<&[u8]> {
        let start = index.checked_mul(self.unit_size)?;
        self.data.get(start..start + self.unit_size)
    }

    /// Смещение юнита `index` от начала потока.
    pub fn stream_offset(
        &self,
        index: usize,
    ) -> u64 {
        self.first_offset + (index * self.unit_size) as u64
    }

    /// Пары `(смещение в потоке, байты юнита)`.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[u8])> + '_ {
        self.data
            .chunks_exact(self.unit_size)
            .enumerate()
            .map(move |(i, unit)| (self.stream_offset(i), unit))
    }
}
