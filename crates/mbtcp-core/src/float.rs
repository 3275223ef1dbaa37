//! IEEE-754 values spread over consecutive registers.
//!
//! Word order is big-endian throughout: the first register holds the most
//! significant 16 bits. Devices that swap words need to reorder registers
//! before calling these.

pub fn f32_from_be_bytes(bytes: &[u8; 4]) -> f32 {
    f32::from_be_bytes(*bytes)
}

pub fn f64_from_be_bytes(bytes: &[u8; 8]) -> f64 {
    f64::from_be_bytes(*bytes)
}

pub fn f32_from_registers(regs: [u16; 2]) -> f32 {
    f32::from_bits((u32::from(regs[0]) << 16) | u32::from(regs[1]))
}

pub fn f32_to_registers(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, bits as u16]
}

pub fn f64_from_registers(regs: [u16; 4]) -> f64 {
    let bits = regs
        .iter()
        .fold(0u64, |acc, reg| (acc << 16) | u64::from(*reg));
    f64::from_bits(bits)
}

pub fn f64_to_registers(value: f64) -> [u16; 4] {
    let bits = value.to_bits();
    [
        (bits >> 48) as u16,
        (bits >> 32) as u16,
        (bits >> 16) as u16,
        bits as u16,
    ]
}
