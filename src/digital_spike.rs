//! Replay model of the digital-to-spike (DS) front end.
//!
//! Each unit turns an integer code into a temporal spike train by cycling
//! through one row of a calibrated code x cycle bit pattern.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

use crate::error::NemoResult;

const NS_PER_US: f64 = 1000.0;
const SPIKE_WIDTH_NS: f64 = 100.0;
const MIN_SPIKE_INTERVAL_NS: f64 = 200.0;
const FREQUENCY_MODE_BASE: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DsMode {
    Threshold,
    Frequency,
}

/// Code x cycle bit pattern. Row `c` is the spike train replayed for code `c`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsPattern {
    rows: Vec<Vec<u8>>,
}

impl DsPattern {
    pub fn new(rows: Vec<Vec<u8>>) -> Result<Self, SimpleError> {
        let pattern = Self { rows };
        pattern.validate()?;
        Ok(pattern)
    }

    pub fn validate(&self) -> Result<(), SimpleError> {
        let num_columns = self.num_columns();

        if self.rows.is_empty() || num_columns == 0 {
            return Err(SimpleError::new(
                "ds pattern must have at least one row and one column",
            ));
        }

        if self.rows.iter().any(|row| row.len() != num_columns) {
            return Err(SimpleError::new("ds pattern rows must have equal length"));
        }

        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn row(&self, code: usize) -> Option<&[u8]> {
        self.rows.get(code).map(Vec::as_slice)
    }

    fn is_spike(&self, code: usize, cycle: usize) -> bool {
        self.rows[code][cycle % self.num_columns()] != 0
    }
}

impl Default for DsPattern {
    fn default() -> Self {
        #[rustfmt::skip]
        const ROWS: [[u8; 32]; 16] = [
            [1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0],
            [1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,0,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0],
            [1,0,1,0,1,0,0,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,1,0,0,0,1,0,1,0,1,0],
            [1,0,1,0,1,0,0,0,1,0,1,0,1,0,1,0,0,0,1,0,1,0,1,0,0,0,1,0,1,0,1,0],
            [1,0,1,0,0,0,1,0,1,0,0,0,1,0,1,0,1,0,1,0,0,0,1,0,1,0,0,0,1,0,1,0],
            [1,0,1,0,0,0,1,0,1,0,0,0,1,0,1,0,0,0,1,0,0,0,1,0,1,0,0,0,1,0,1,0],
            [1,0,0,0,1,0,0,0,1,0,1,0,0,0,1,0,1,0,0,0,1,0,1,0,0,0,1,0,0,0,1,0],
            [1,0,0,0,1,0,0,0,1,0,1,0,0,0,1,0,0,0,0,0,1,0,1,0,0,0,1,0,0,0,1,0],
            [1,0,0,0,1,0,0,0,1,0,0,0,1,0,0,0,1,0,0,0,1,0,0,0,1,0,0,0,1,0,0,0],
            [1,0,0,0,1,0,0,0,1,0,0,0,1,0,0,0,0,0,0,0,1,0,0,0,1,0,0,0,1,0,0,0],
            [1,0,0,0,1,0,0,0,1,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,1,0,0,0,1,0,0,0],
            [1,0,0,0,1,0,0,0,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1,0,0,0,1,0,0,0],
            [1,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0],
            [1,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0],
            [0,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,0,0],
            [0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0],
        ];

        Self {
            rows: ROWS.iter().map(|row| row.to_vec()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigitalSpikeEncoder {
    pattern: Arc<DsPattern>,
    clock_period_ns: f64,
    bit_width: u32,
    mode: DsMode,
    code: usize,
    cycle: usize,
    current_time_ns: f64,
    last_spike_time_ns: f64,
}

impl DigitalSpikeEncoder {
    pub fn new(
        clock_frequency_mhz: f64,
        bit_width: u32,
        mode: DsMode,
        pattern: Arc<DsPattern>,
    ) -> NemoResult<Self> {
        if clock_frequency_mhz <= 0.0 {
            return Err(SimpleError::new("ds clock frequency must be strictly positive").into());
        }

        pattern.validate()?;

        Ok(Self {
            pattern,
            clock_period_ns: NS_PER_US / clock_frequency_mhz,
            bit_width,
            mode,
            code: 0,
            cycle: 0,
            current_time_ns: 0.0,
            last_spike_time_ns: -MIN_SPIKE_INTERVAL_NS,
        })
    }

    /// Loads a new code, clamped to the last pattern row. Takes effect on the
    /// next tick; the cycle counter is left untouched.
    pub fn set_code(&mut self, code: u32) {
        self.code = (code as usize).min(self.pattern.num_rows() - 1);
    }

    pub fn get_code(&self) -> usize {
        self.code
    }

    pub fn tick(&mut self) -> bool {
        let spike = self.pattern.is_spike(self.code, self.cycle);

        if spike {
            self.last_spike_time_ns = self.current_time_ns;
        }

        self.current_time_ns += self.clock_period_ns;
        self.cycle += 1;

        spike
    }

    pub fn reset(&mut self) {
        self.cycle = 0;
        self.current_time_ns = 0.0;
        self.last_spike_time_ns = -MIN_SPIKE_INTERVAL_NS;
    }

    pub fn get_cycle(&self) -> usize {
        self.cycle
    }

    pub fn get_pattern_length(&self) -> usize {
        self.pattern.num_columns()
    }

    pub fn get_mode(&self) -> DsMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DsMode) {
        self.mode = mode;
    }

    pub fn get_bit_width(&self) -> u32 {
        self.bit_width
    }

    pub fn get_clock_period_ns(&self) -> f64 {
        self.clock_period_ns
    }

    pub fn get_elapsed_ns(&self) -> f64 {
        self.current_time_ns
    }

    /// Whether the most recent spike is still within its pulse width.
    pub fn is_spike_active(&self) -> bool {
        self.current_time_ns - self.last_spike_time_ns < SPIKE_WIDTH_NS
    }

    /// Clock cycles between spikes implied by the current code and mode.
    pub fn get_threshold(&self) -> u64 {
        let code = self.code as u64;

        let threshold = match self.mode {
            DsMode::Threshold => (1u64 << self.bit_width).saturating_sub(code),
            DsMode::Frequency => 1 + FREQUENCY_MODE_BASE.saturating_sub(code),
        };

        threshold.max(1)
    }

    pub fn get_spike_period_ns(&self) -> f64 {
        self.clock_period_ns * self.get_threshold() as f64
    }

    pub fn get_spike_rate_mhz(&self) -> f64 {
        NS_PER_US / self.get_spike_period_ns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NemoError;
    use float_cmp::assert_approx_eq;
    use itertools::assert_equal;

    fn encoder() -> DigitalSpikeEncoder {
        DigitalSpikeEncoder::new(10.0, 4, DsMode::Threshold, Arc::new(DsPattern::default()))
            .unwrap()
    }

    fn replay(sut: &mut DigitalSpikeEncoder, n: usize) -> Vec<u8> {
        (0..n).map(|_| sut.tick() as u8).collect()
    }

    #[test]
    fn default_pattern_shape() {
        let pattern = DsPattern::default();
        assert_eq!(pattern.num_rows(), 16);
        assert_eq!(pattern.num_columns(), 32);
        assert!(pattern.validate().is_ok());
        assert!(pattern.row(15).is_some());
        assert!(pattern.row(16).is_none());
    }

    #[test]
    fn replays_pattern_row() {
        let pattern = DsPattern::default();

        for code in [0, 3, 7, 15] {
            let mut sut = encoder();
            sut.set_code(code);
            assert_equal(replay(&mut sut, 32), pattern.row(code as usize).unwrap().to_vec());
        }
    }

    #[test]
    fn replay_wraps_around() {
        let pattern = DsPattern::default();
        let mut sut = encoder();
        sut.set_code(14);
        replay(&mut sut, 32);
        assert_equal(replay(&mut sut, 10), pattern.row(14).unwrap()[..10].to_vec());
    }

    #[test]
    fn code_is_clamped() {
        let pattern = DsPattern::default();
        let mut sut = encoder();
        sut.set_code(100);
        assert_eq!(sut.get_code(), 15);
        assert_equal(replay(&mut sut, 32), pattern.row(15).unwrap().to_vec());
    }

    #[test]
    fn reset_reproduces_sequence() {
        let codes = [2, 9, 9, 15, 0];
        let mut sut = encoder();

        let run = |sut: &mut DigitalSpikeEncoder| -> Vec<u8> {
            codes
                .iter()
                .flat_map(|code| {
                    sut.set_code(*code);
                    replay(sut, 7)
                })
                .collect()
        };

        let first = run(&mut sut);
        assert_eq!(sut.get_cycle(), 35);
        sut.reset();
        assert_eq!(sut.get_cycle(), 0);
        let second = run(&mut sut);
        assert_eq!(first, second);
    }

    #[test]
    fn code_change_applies_on_next_tick() {
        let pattern = DsPattern::default();
        let mut sut = encoder();
        sut.set_code(15);
        replay(&mut sut, 16);
        sut.set_code(0);
        // cycle 16 of row 0
        assert_eq!(sut.tick(), pattern.row(0).unwrap()[16] != 0);
    }

    #[test]
    fn timing_model() {
        let mut sut = encoder();
        assert_approx_eq!(f64, sut.get_clock_period_ns(), 100.0);

        sut.set_code(6);
        assert_eq!(sut.get_threshold(), 10);
        assert_approx_eq!(f64, sut.get_spike_period_ns(), 1000.0);
        assert_approx_eq!(f64, sut.get_spike_rate_mhz(), 1.0);

        sut.set_mode(DsMode::Frequency);
        assert_eq!(sut.get_threshold(), 11);

        sut.tick();
        sut.tick();
        assert_approx_eq!(f64, sut.get_elapsed_ns(), 200.0);
        sut.reset();
        assert_approx_eq!(f64, sut.get_elapsed_ns(), 0.0);
    }

    #[test]
    fn spike_activity_window() {
        let mut sut =
            DigitalSpikeEncoder::new(20.0, 4, DsMode::Threshold, Arc::new(DsPattern::default()))
                .unwrap();
        sut.set_code(0);
        assert!(!sut.is_spike_active());

        assert!(sut.tick());
        assert!(sut.is_spike_active());

        assert!(!sut.tick());
        assert!(!sut.is_spike_active());
    }

    #[test]
    fn invalid_clock() {
        let result =
            DigitalSpikeEncoder::new(0.0, 4, DsMode::Threshold, Arc::new(DsPattern::default()));
        assert!(matches!(result, Err(NemoError::Construction(_))));
    }

    #[test]
    fn ragged_pattern_is_rejected() {
        let result = DsPattern::new(vec![vec![1, 0], vec![1]]);
        assert_eq!(
            result.unwrap_err().as_str(),
            "ds pattern rows must have equal length"
        );
    }

    #[test]
    fn custom_pattern() {
        let pattern = Arc::new(DsPattern::new(vec![vec![0, 1, 1], vec![1, 1, 1]]).unwrap());
        let mut sut = DigitalSpikeEncoder::new(1.0, 1, DsMode::Threshold, pattern).unwrap();
        assert_eq!(sut.get_pattern_length(), 3);
        sut.set_code(1);
        assert_equal(replay(&mut sut, 4), vec![1, 1, 1, 1]);
        sut.set_code(0);
        assert_equal(replay(&mut sut, 3), vec![1, 1, 0]);
    }
}
