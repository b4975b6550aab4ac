#![allow(dead_code)]

use retroemulib::gb::CartridgeHeader;

const GB_ROM_SIZE: usize = 0x8000;
const GB_PROGRAM_START: usize = 0x0100;

const INES_PRG_BANK_SIZE: usize = 0x4000;
const INES_CHR_BANK_SIZE: usize = 0x2000;

/// A 32 KiB ROM-only image with `program` at the entry point, RETI at every
/// interrupt vector and a valid header checksum.
pub fn gb_rom(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0x00; GB_ROM_SIZE];
    for vector in [0x40, 0x48, 0x50, 0x58, 0x60] {
        rom[vector] = 0xD9;
    }

    rom[GB_PROGRAM_START..GB_PROGRAM_START + program.len()].copy_from_slice(program);

    rom[0x0134..0x0138].copy_from_slice(b"TEST");
    rom[0x0147] = 0x00;
    rom[0x0148] = 0x00;
    rom[0x0149] = 0x00;
    rom[0x014D] = CartridgeHeader::computed_checksum(&rom);
    rom
}

/// An NROM-128 image with `program` at 0x8000. Reset, NMI and IRQ all point at it.
pub fn nes_image(program: &[u8]) -> Vec<u8> {
    let mut image = vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

    let mut prg = vec![0xEA; INES_PRG_BANK_SIZE];
    prg[..program.len()].copy_from_slice(program);
    // 0xFFFA-0xFFFF mirror to the end of the single bank
    prg[INES_PRG_BANK_SIZE - 6..].copy_from_slice(&[0x00, 0x80, 0x00, 0x80, 0x00, 0x80]);

    image.extend(prg);
    image.extend(std::iter::repeat(0).take(INES_CHR_BANK_SIZE));
    image
}

/// Installs a test subscriber so RUST_LOG=trace shows emulator logs for a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
