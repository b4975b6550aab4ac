use crate::SystemControl;

/// Periodically bends a pulse channel's timer period up or down.
pub struct Sweep {
    enabled: bool,
    divider_period: u8,
    negate: bool,
    shift: u8,
    reload: bool,
    divider: u8,

    // pulse 1 negates with ones' complement, pulse 2 with two's complement
    ones_complement: bool,
}

impl SystemControl for Sweep {
    fn reset(&mut self) {
        self.enabled = false;
        self.divider_period = 0;
        self.negate = false;
        self.shift = 0;
        self.reload = false;
        self.divider = 0;
    }
}

impl Sweep {
    pub fn new(ones_complement: bool) -> Self {
        Self {
            enabled: false,
            divider_period: 0,
            negate: false,
            shift: 0,
            reload: false,
            divider: 0,

            ones_complement,
        }
    }

    pub fn write_control(&mut self, byte: u8) {
        self.enabled = (byte & 0b10000000) != 0;
        self.divider_period = (byte & 0b01110000) >> 4;
        self.negate = (byte & 0b00001000) != 0;
        self.shift = byte & 0b00000111;
        self.reload = true;
    }

    pub fn target_period(&self, period: u16) -> u16 {
        let change = period >> self.shift;

        if self.negate {
            period.saturating_sub(change + self.ones_complement as u16)
        } else {
            period + change
        }
    }

    /// The channel is silenced whenever the period is too short or the sweep would overflow it,
    /// even if the sweep unit itself is disabled.
    #[inline]
    pub fn mutes(&self, period: u16) -> bool {
        period < 8 || self.target_period(period) > 0x7FF
    }

    /// Half-frame clock.
    pub fn clock(&mut self, period: &mut u16) {
        if self.divider == 0 && self.enabled && self.shift > 0 && !self.mutes(*period) {
            *period = self.target_period(*period);
        }

        if self.divider == 0 || self.reload {
            self.divider = self.divider_period;
            self.reload = false;
        } else {
            self.divider -= 1;
        }
    }
}
