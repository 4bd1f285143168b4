// Обратная сторона ByteCursor: нужна для синтеза потоков в тестах,
// бенчмарках и симуляторе.

pub fn write_u8(
    buf: &mut Vec<u8>,
    val: u8,
) {
    buf.push(val);
}

pub fn write_u16_le(
    buf: &mut Vec<u8>,
    val: u16,
) {
    buf.extend_from_slice(&val.to_le_bytes());
}

pub fn write_u32_le(
    buf: &mut Vec<u8>,
    val: u32,
) {
    buf.extend_from_slice(&val.to_le_bytes());
}

pub fn write_i32_le(
    buf: &mut Vec<u8>,
    val: i32,
) {
    buf.extend_from_slice(&val.to_le_bytes());
}
