use super::registers::Lcdc;

const FIFO_CAPACITY: usize = 16;
const TILE_WIDTH: usize = 8;
const VRAM_START: u16 = 0x8000;

/// Background/window colour indices waiting to be shifted out.
pub struct PixelFifo {
    pixels: [u8; FIFO_CAPACITY],
    head: usize,
    len: usize,
}

impl PixelFifo {
    pub fn new() -> Self {
        Self {
            pixels: [0; FIFO_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// A row of 8 pixels fits only while the FIFO holds at most 8.
    #[inline]
    pub fn can_accept_row(&self) -> bool {
        self.len <= FIFO_CAPACITY - TILE_WIDTH
    }

    /// Pixels are shifted out only while more than 8 are queued.
    #[inline]
    pub fn can_output(&self) -> bool {
        self.len > TILE_WIDTH
    }

    /// Queues the 8 pixels of a tile row, leftmost first. Returns false when full.
    pub fn push_row(&mut self, data_lo: u8, data_hi: u8) -> bool {
        if !self.can_accept_row() {
            return false;
        }

        for bit in (0..8).rev() {
            let colour = ((data_hi >> bit) & 0x01) << 1 | ((data_lo >> bit) & 0x01);
            self.pixels[(self.head + self.len) % FIFO_CAPACITY] = colour;
            self.len += 1;
        }

        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }

        let colour = self.pixels[self.head];
        self.head = (self.head + 1) % FIFO_CAPACITY;
        self.len -= 1;
        Some(colour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherState {
    TileIndex,
    DataLow,
    DataHigh,
    Idle,
    Push,
}

/// Register values a fetch depends on, sampled by the PPU each dot.
pub struct FetchParams {
    pub lcdc: Lcdc,
    pub scx: u8,
    pub scy: u8,
    pub ly: u8,
    pub window_line: u8,
}

/// The background/window tile fetcher. Every state but Push takes two dots; the
/// row is pushed at the end of Idle and retried each dot until the FIFO has room.
pub struct Fetcher {
    state: FetcherState,
    second_dot: bool,
    tile_x: u8,
    tile_index: u8,
    tile_row: u8,
    data_lo: u8,
    data_hi: u8,
    window: bool,
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            state: FetcherState::TileIndex,
            second_dot: false,
            tile_x: 0,
            tile_index: 0,
            tile_row: 0,
            data_lo: 0,
            data_hi: 0,
            window: false,
        }
    }

    /// Restarts at the first background tile of a line.
    pub fn start_line(&mut self) {
        *self = Fetcher::new();
    }

    /// Restarts at the first tile of the window.
    pub fn start_window(&mut self) {
        *self = Fetcher { window: true, ..Fetcher::new() };
    }

    #[inline]
    pub fn state(&self) -> FetcherState {
        self.state
    }

    #[inline]
    pub fn in_window(&self) -> bool {
        self.window
    }

    pub fn tick(&mut self, vram: &[u8], params: &FetchParams, fifo: &mut PixelFifo) {
        if self.state == FetcherState::Push {
            self.try_push(fifo);
            return;
        }

        if !self.second_dot {
            self.second_dot = true;
            return;
        }
        self.second_dot = false;

        match self.state {
            FetcherState::TileIndex => {
                let (map_addr, row) = self.map_position(params);
                self.tile_index = vram_byte(vram, map_addr);
                self.tile_row = row;
                self.state = FetcherState::DataLow;
            }
            FetcherState::DataLow => {
                let addr = params.lcdc.tile_data_addr(self.tile_index, self.tile_row);
                self.data_lo = vram_byte(vram, addr);
                self.state = FetcherState::DataHigh;
            }
            FetcherState::DataHigh => {
                let addr = params.lcdc.tile_data_addr(self.tile_index, self.tile_row);
                self.data_hi = vram_byte(vram, addr + 1);
                self.state = FetcherState::Idle;
            }
            FetcherState::Idle | FetcherState::Push => {
                self.state = FetcherState::Push;
                self.try_push(fifo);
            }
        }
    }

    fn try_push(&mut self, fifo: &mut PixelFifo) {
        if fifo.push_row(self.data_lo, self.data_hi) {
            self.tile_x = self.tile_x.wrapping_add(1);
            self.state = FetcherState::TileIndex;
        }
    }

    /// Tile map address of the next tile and the pixel row within it.
    fn map_position(&self, params: &FetchParams) -> (u16, u8) {
        if self.window {
            let row = params.window_line as u16 / 8;
            let addr = params.lcdc.window_tile_map() + row * 32 + (self.tile_x as u16 & 0x1F);
            (addr, params.window_line & 0x07)
        } else {
            let y = params.scy.wrapping_add(params.ly);
            let column = ((params.scx / 8) as u16 + self.tile_x as u16) & 0x1F;
            let addr = params.lcdc.bg_tile_map() + (y as u16 / 8) * 32 + column;
            (addr, y & 0x07)
        }
    }
}

#[inline]
fn vram_byte(vram: &[u8], addr: u16) -> u8 {
    vram[(addr - VRAM_START) as usize % vram.len()]
}
