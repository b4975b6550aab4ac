mod common;

use retroemulib::gb::{CartridgeHeader, MbcKind, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use retroemulib::{Button, EmulatorConfig, GameBoy, LoadState};

use common::{gb_rom, init_tracing};

// 154 lines of 456 dots
const DOTS_PER_FRAME: u64 = 70224;

const IF_REG: u16 = 0xFF0F;
const IE_REG: u16 = 0xFFFF;

fn load(program: &[u8]) -> GameBoy {
    init_tracing();
    GameBoy::from_rom_bytes(&gb_rom(program), &EmulatorConfig::default()).unwrap()
}

fn pending_flags(gameboy: &GameBoy) -> Option<u8> {
    gameboy.read_memory(IF_REG).map(|byte| byte & 0x1F)
}

#[test]
fn test_frame_length_and_blank_background() {
    // JR -2
    let mut gameboy = load(&[0x18, 0xFE]);
    assert_eq!(gameboy.load_state(), LoadState::Loaded);

    for _ in 0..3 {
        gameboy.run_frame().unwrap();
    }

    assert_eq!(gameboy.frame_count(), 3);
    assert_eq!(gameboy.last_frame_dots(), DOTS_PER_FRAME);

    // zeroed VRAM draws colour 0 everywhere, which BGP 0xFC maps to white
    let frame = gameboy.frame().unwrap();
    assert_eq!(frame.len(), DISPLAY_WIDTH * DISPLAY_HEIGHT * 3);
    assert!(frame.iter().all(|&byte| byte == 0xFF));
}

#[test]
fn test_interrupts_serviced_in_priority_order() {
    let mut gameboy = load(&[
        0x3E, 0x05, // LD A,0x05
        0xE0, 0xFF, // LDH (0xFF),A
        0x3E, 0x05, // LD A,0x05
        0xE0, 0x0F, // LDH (0x0F),A
        0xFB,       // EI
        0x00,       // NOP
        0x18, 0xFE, // JR -2
    ]);

    for _ in 0..5 {
        gameboy.step().unwrap();
    }
    assert_eq!(gameboy.read_memory(IE_REG), Some(0x05));
    assert_eq!(pending_flags(&gameboy), Some(0x05));
    // EI takes effect after the following instruction
    assert!(!gameboy.cpu_snapshot().ime);

    gameboy.step().unwrap();
    assert!(gameboy.cpu_snapshot().ime);

    assert_eq!(gameboy.step(), Ok(20));
    let cpu = gameboy.cpu_snapshot();
    assert_eq!(cpu.registers.pc, 0x0040);
    assert_eq!(cpu.registers.sp, 0xFFFC);
    assert!(!cpu.ime);
    assert_eq!(pending_flags(&gameboy), Some(0x04));

    // RETI
    assert_eq!(gameboy.step(), Ok(16));
    assert_eq!(gameboy.cpu_snapshot().registers.pc, 0x010A);

    assert_eq!(gameboy.step(), Ok(20));
    assert_eq!(gameboy.cpu_snapshot().registers.pc, 0x0050);
    assert_eq!(pending_flags(&gameboy), Some(0x00));
}

#[test]
fn test_joypad_press_wakes_halt() {
    let mut gameboy = load(&[
        0x3E, 0x10, // LD A,0x10
        0xE0, 0xFF, // LDH (0xFF),A
        0xAF,       // XOR A
        0xE0, 0x0F, // LDH (0x0F),A
        0xFB,       // EI
        0x76,       // HALT
        0x18, 0xFE, // JR -2
    ]);

    for _ in 0..6 {
        gameboy.step().unwrap();
    }
    assert!(gameboy.cpu_snapshot().halted);

    assert_eq!(gameboy.step(), Ok(4));
    assert!(gameboy.cpu_snapshot().halted);

    gameboy.press(Button::A);
    gameboy.step().unwrap();

    let cpu = gameboy.cpu_snapshot();
    assert!(!cpu.halted);
    assert_eq!(cpu.registers.pc, 0x0060);
    assert_eq!(pending_flags(&gameboy), Some(0x00));
}

#[test]
fn test_stop_waits_for_button() {
    // STOP; INC B
    let mut gameboy = load(&[0x10, 0x00, 0x04]);
    let b = gameboy.cpu_snapshot().registers.b;

    gameboy.step().unwrap();
    assert!(gameboy.cpu_snapshot().stopped);
    assert_eq!(gameboy.read_memory(0xFF04), Some(0x00));

    assert_eq!(gameboy.step(), Ok(4));
    assert_eq!(gameboy.cpu_snapshot().registers.b, b);

    gameboy.press(Button::Start);
    assert!(!gameboy.cpu_snapshot().stopped);

    gameboy.step().unwrap();
    assert_eq!(gameboy.cpu_snapshot().registers.b, b.wrapping_add(1));
}

#[test]
fn test_oam_dma_from_work_ram() {
    // JR -2
    let mut gameboy = load(&[0x18, 0xFE]);
    gameboy.write_memory(0xFF40, 0x00);

    for offset in 0..0xA0u16 {
        gameboy.write_memory(0xC100 + offset, offset as u8 ^ 0x5A);
    }

    gameboy.write_memory(0xFF46, 0xC1);
    assert_eq!(gameboy.read_memory(0xFF46), Some(0xC1));
    assert_eq!(gameboy.read_memory(0xFE00), Some(0xFF));

    // 160 bytes at one per M-cycle, after a one M-cycle start-up delay
    let start = gameboy.total_cycles();
    while gameboy.total_cycles() - start < 4 * 161 {
        gameboy.step().unwrap();
    }

    for offset in 0..0xA0u16 {
        assert_eq!(gameboy.read_memory(0xFE00 + offset), Some(offset as u8 ^ 0x5A));
    }
}

#[test]
fn test_mbc1_bank_switching() {
    // four 16 KiB banks, each filled with its own number
    let mut rom: Vec<u8> = (0..4u8).flat_map(|bank| std::iter::repeat(bank).take(0x4000)).collect();
    rom[0x0134..0x0144].fill(0);
    rom[0x0147] = 0x01;
    rom[0x0148] = 0x01;
    rom[0x0149] = 0x00;
    rom[0x014A..0x014D].fill(0);
    rom[0x014D] = CartridgeHeader::computed_checksum(&rom);

    let mut gameboy = GameBoy::from_rom_bytes(&rom, &EmulatorConfig::default()).unwrap();
    assert_eq!(gameboy.header().map(|header| header.mbc), Some(MbcKind::Mbc1));
    assert_eq!(gameboy.read_memory(0x4000), Some(1));

    gameboy.write_memory(0x2000, 0x03);
    assert_eq!(gameboy.read_memory(0x4000), Some(3));

    // bank 0 selects bank 1
    gameboy.write_memory(0x2000, 0x00);
    assert_eq!(gameboy.read_memory(0x4000), Some(1));
    assert_eq!(gameboy.read_memory(0x0000), Some(0));
}

#[test]
fn test_palette_from_config() {
    let mut config = EmulatorConfig::default();
    config.dmg_palette[0] = (0x0F, 0xBC, 0x9B);

    let mut gameboy = GameBoy::from_rom_bytes(&gb_rom(&[0x18, 0xFE]), &config).unwrap();
    gameboy.run_frame().unwrap();
    gameboy.run_frame().unwrap();

    let frame = gameboy.frame().unwrap();
    assert_eq!(&frame[..3], &[0x0F, 0xBC, 0x9B]);
}
