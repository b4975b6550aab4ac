use crate::SystemControl;

// Checkpoints in CPU cycles since the sequence last restarted
const STEP_1: u32 = 7457;
const STEP_2: u32 = 14913;
const STEP_3: u32 = 22371;
const FOUR_STEP_IRQ_START: u32 = 29828;
const FOUR_STEP_4: u32 = 29829;
const FOUR_STEP_PERIOD: u32 = 29830;
const FIVE_STEP_5: u32 = 37281;
const FIVE_STEP_PERIOD: u32 = 37282;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClock {
    /// Envelopes and the triangle's linear counter.
    Quarter,
    /// A quarter clock plus length counters and sweeps.
    Half,
}

pub struct FrameSequencer {
    pub five_step: bool,
    pub irq_inhibit: bool,

    cycles: u32,
}

impl SystemControl for FrameSequencer {
    fn reset(&mut self) {
        self.five_step = false;
        self.irq_inhibit = false;
        self.cycles = 0;
    }
}

impl FrameSequencer {
    pub fn new() -> Self {
        Self {
            five_step: false,
            irq_inhibit: false,
            cycles: 0,
        }
    }

    /// Advances one CPU cycle. Raises `irq_flag` during the last steps of the 4-step sequence.
    pub fn clock(&mut self, irq_flag: &mut bool) -> Option<FrameClock> {
        self.cycles += 1;

        if !self.five_step && (FOUR_STEP_IRQ_START..=FOUR_STEP_PERIOD).contains(&self.cycles) && !self.irq_inhibit {
            *irq_flag = true;
        }

        match (self.five_step, self.cycles) {
            (_, STEP_1) | (_, STEP_3) => Some(FrameClock::Quarter),
            (_, STEP_2) => Some(FrameClock::Half),
            (false, FOUR_STEP_4) => Some(FrameClock::Half),
            (false, FOUR_STEP_PERIOD) => {
                self.cycles = 0;
                None
            }
            (true, FIVE_STEP_5) => Some(FrameClock::Half),
            (true, FIVE_STEP_PERIOD) => {
                self.cycles = 0;
                None
            }
            _ => None,
        }
    }

    /// Handles a $4017 write. Selecting the 5-step sequence clocks every unit immediately.
    pub fn write_control(&mut self, byte: u8) -> Option<FrameClock> {
        self.five_step = (byte & 0b10000000) != 0;
        self.irq_inhibit = (byte & 0b01000000) != 0;
        self.cycles = 0;

        self.five_step.then_some(FrameClock::Half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(sequencer: &mut FrameSequencer, cycles: u32, irq: &mut bool) -> Vec<(u32, FrameClock)> {
        (1..=cycles).filter_map(|n| sequencer.clock(irq).map(|clock| (n, clock))).collect()
    }

    #[test]
    fn test_four_step_sequence() {
        let mut sequencer = FrameSequencer::new();
        let mut irq = false;

        let clocks = run(&mut sequencer, FOUR_STEP_IRQ_START - 1, &mut irq);
        assert!(!irq);
        assert_eq!(clocks, vec![
            (7457, FrameClock::Quarter),
            (14913, FrameClock::Half),
            (22371, FrameClock::Quarter),
        ]);

        let clocks = run(&mut sequencer, 3, &mut irq);
        assert!(irq);
        assert_eq!(clocks, vec![(2, FrameClock::Half)]);

        // sequence restarted
        irq = false;
        let clocks = run(&mut sequencer, STEP_1, &mut irq);
        assert_eq!(clocks, vec![(STEP_1, FrameClock::Quarter)]);
        assert!(!irq);
    }

    #[test]
    fn test_five_step_sequence_has_no_irq() {
        let mut sequencer = FrameSequencer::new();
        let mut irq = false;
        assert_eq!(sequencer.write_control(0x80), Some(FrameClock::Half));

        let clocks = run(&mut sequencer, FIVE_STEP_PERIOD, &mut irq);
        assert!(!irq);
        assert_eq!(clocks.len(), 4);
        assert_eq!(clocks[3], (FIVE_STEP_5, FrameClock::Half));
    }

    #[test]
    fn test_irq_inhibit() {
        let mut sequencer = FrameSequencer::new();
        let mut irq = false;
        assert_eq!(sequencer.write_control(0x40), None);

        run(&mut sequencer, FOUR_STEP_PERIOD, &mut irq);
        assert!(!irq);
    }
}
