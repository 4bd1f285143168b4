use rhx_types::{
    wire::{CHANNEL_NAME_LEN, SPIKE_CHUNK_SIZE, SPIKE_MAGIC},
    ChannelName, RhxError, RhxResult, SpikeEvent, StreamKind,
};

use crate::binary::{write_u32_le, write_u8, ByteCursor};

/// Декодер 14-байтных спайк-чанков.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpikeEventDecoder;

impl SpikeEventDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Размер юнита в байтах.
    pub fn chunk_size(&self) -> usize {
        SPIKE_CHUNK_SIZE
    }

    pub fn decode(
        &self,
        unit: &[u8],
    ) -> RhxResult<SpikeEvent> {
        self.decode_at(unit, 0)
    }

    /// Разбирает чанк; смещения в ошибках считаются от `stream_offset`.
    ///
    /// Чанки с `unit_id == 0` разбираются как обычно, отбрасывает их сессия.
    pub fn decode_at(
        &self,
        unit: &[u8],
        stream_offset: u64,
    ) -> RhxResult<SpikeEvent> {
        let mut cursor = ByteCursor::with_base_offset(unit, stream_offset);

        let magic_number = cursor.read_u32_le()?;
        if magic_number != SPIKE_MAGIC {
            return Err(RhxError::BadMagicNumber {
                stream: StreamKind::Spike,
                expected: SPIKE_MAGIC,
                found: magic_number,
                offset: stream_offset,
            });
        }

        let channel_name = ChannelName::from_bytes(cursor.read_array::<CHANNEL_NAME_LEN>()?);
        let timestamp_raw = cursor.read_u32_le()?;
        let unit_id = cursor.read_u8()?;

        Ok(SpikeEvent {
            magic_number,
            channel_name,
            timestamp_raw,
            unit_id,
        })
    }
}

/// Сериализует событие в 14 байт.
pub fn encode_spike_event(event: &SpikeEvent) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SPIKE_CHUNK_SIZE);

    write_u32_le(&mut buf, event.magic_number);
    buf.extend_from_slice(event.channel_name.as_bytes());
    write_u32_le(&mut buf, event.timestamp_raw);
    write_u8(&mut buf, event.unit_id);

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_bytes() {
        let bytes = [
            0x0F, 0x71, 0xE2, 0x3A, // magic
            b'A', b'-', b'0', b'1', b'0', // name
            0x30, 0x75, 0x00, 0x00, // 30000
            0x07, // unit id
        ];

        let ev = SpikeEventDecoder::new().decode(&bytes).unwrap();

        assert_eq!(ev.magic_number, SPIKE_MAGIC);
        assert_eq!(ev.channel_name.to_string(), "A-010");
        assert_eq!(ev.timestamp_raw, 30_000);
        assert_eq!(ev.unit_id, 7);
        assert!(ev.is_spike());
    }

    #[test]
    fn test_null_chunk_decodes() {
        let ev = SpikeEvent {
            magic_number: SPIKE_MAGIC,
            channel_name: ChannelName::new("B-031").unwrap(),
            timestamp_raw: 12,
            unit_id: 0,
        };

        let decoded = SpikeEventDecoder::new()
            .decode(&encode_spike_event(&ev))
            .unwrap();

        assert_eq!(decoded, ev);
        assert!(!decoded.is_spike());
    }

    #[test]
    fn test_encode_layout() {
        let ev = SpikeEvent {
            magic_number: SPIKE_MAGIC,
            channel_name: ChannelName::new("C-1").unwrap(),
            timestamp_raw: u32::MAX,
            unit_id: 255,
        };
        let bytes = encode_spike_event(&ev);

        assert_eq!(bytes.len(), SPIKE_CHUNK_SIZE);
        assert_eq!(&bytes[4..9], b"C-1\0\0");
        assert_eq!(&bytes[9..13], &[0xFF; 4]);
        assert_eq!(bytes[13], 255);
    }

    #[test]
    fn test_bad_magic_reports_stream_offset() {
        let mut bytes = encode_spike_event(&SpikeEvent {
            magic_number: SPIKE_MAGIC,
            channel_name: ChannelName::new("A-000").unwrap(),
            timestamp_raw: 0,
            unit_id: 1,
        });
        bytes[0] ^= 0xFF;

        match SpikeEventDecoder::new().decode_at(&bytes, 28) {
            Err(RhxError::BadMagicNumber {
                stream,
                expected,
                offset,
                ..
            }) => {
                assert_eq!(stream, StreamKind::Spike);
                assert_eq!(expected, SPIKE_MAGIC);
                assert_eq!(offset, 28);
            }
            other => panic!("expected BadMagicNumber, got {other:?}"),
        }
    }

    #[test]
    fn test_short_unit() {
        let bytes = encode_spike_event(&SpikeEvent {
            magic_number: SPIKE_MAGIC,
            channel_name: ChannelName::new("A-000").unwrap(),
            timestamp_raw: 0,
            unit_id: 1,
        });

        let err = SpikeEventDecoder::new().decode(&bytes[..13]).unwrap_err();

        assert_eq!(
            err,
            RhxError::OutOfBounds {
                offset: 13,
                needed: 1,
                available: 0,
            }
        );
    }
}
