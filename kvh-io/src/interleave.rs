//! Demultiplexing of the interleaved temperature / magnetometer field
//!
//! Each frame carries one auxiliary scalar. Which quantity it is depends only
//! on the transmitted sequence counter:
//!
//! | `sequence % 4` | Slot |
//! |---|---|
//! | 0 | temperature (°C) |
//! | 1 | magnetometer X (Gauss) |
//! | 2 | magnetometer Y (Gauss) |
//! | 3 | magnetometer Z (Gauss) |
//!
//! Lost frames therefore never shift the mapping. Every decoded frame writes
//! its slot; a value from a frame that failed CRC is kept but marked, so
//! readers decide whether to trust it.

use crate::protocol::constants::AUX_SLOT_COUNT;

/// Auxiliary slot selected by `sequence % 4`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxSlot {
    Temperature,
    MagX,
    MagY,
    MagZ,
}

impl AuxSlot {
    pub const ALL: [AuxSlot; AUX_SLOT_COUNT] =
        [AuxSlot::Temperature, AuxSlot::MagX, AuxSlot::MagY, AuxSlot::MagZ];

    /// Slot for a transmitted sequence value
    #[inline]
    pub fn from_sequence(sequence: u8) -> Self {
        Self::ALL[(sequence % AUX_SLOT_COUNT as u8) as usize]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            AuxSlot::Temperature => "temperature",
            AuxSlot::MagX => "mag_x",
            AuxSlot::MagY => "mag_y",
            AuxSlot::MagZ => "mag_z",
        }
    }
}

/// Last known value of one slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotValue {
    pub value: f32,
    /// Sequence of the frame that wrote it
    pub sequence: u8,
    /// Session frame counter at write time, for ageing by the caller
    pub frame_index: u64,
    /// Range check result for the value
    pub in_range: bool,
    /// CRC result of the frame that wrote it
    pub crc_valid: bool,
}

impl SlotValue {
    /// From a CRC-valid frame and within its declared range
    #[inline]
    pub fn is_trusted(&self) -> bool {
        self.crc_valid && self.in_range
    }
}

/// Four-slot auxiliary state owned by one decode session
#[derive(Debug, Clone, Default)]
pub struct InterleaveState {
    slots: [Option<SlotValue>; AUX_SLOT_COUNT],
}

impl InterleaveState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` in the slot selected by its sequence, replacing what was there
    pub fn update(&mut self, value: SlotValue) -> AuxSlot {
        let slot = AuxSlot::from_sequence(value.sequence);
        self.slots[slot.index()] = Some(value);
        slot
    }

    #[inline]
    pub fn get(&self, slot: AuxSlot) -> Option<&SlotValue> {
        self.slots[slot.index()].as_ref()
    }

    /// Composite view of all four slots
    pub fn view(&self) -> AuxView {
        AuxView {
            temperature: self.slots[0],
            mag: [self.slots[1], self.slots[2], self.slots[3]],
        }
    }

    pub fn clear(&mut self) {
        self.slots = [None; AUX_SLOT_COUNT];
    }
}

/// Slowly updating 4-channel auxiliary block
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AuxView {
    pub temperature: Option<SlotValue>,
    pub mag: [Option<SlotValue>; 3],
}

impl AuxView {
    /// Temperature in °C, if one has been seen
    pub fn temperature_c(&self) -> Option<f32> {
        self.temperature.map(|s| s.value)
    }

    /// Magnetic field in Gauss, only once all three axes are known
    pub fn mag_gauss(&self) -> Option<[f32; 3]> {
        match self.mag {
            [Some(x), Some(y), Some(z)] => Some([x.value, y.value, z.value]),
            _ => None,
        }
    }

    /// The same view with untrusted slot values treated as unknown
    pub fn trusted(&self) -> AuxView {
        let keep = |s: Option<SlotValue>| s.filter(SlotValue::is_trusted);
        AuxView {
            temperature: keep(self.temperature),
            mag: self.mag.map(keep),
        }
    }

    /// Age of each slot in frames relative to `now_index` (temperature, x, y, z)
    pub fn ages(&self, now_index: u64) -> [Option<u64>; AUX_SLOT_COUNT] {
        let age = |s: Option<SlotValue>| s.map(|v| now_index.saturating_sub(v.frame_index));
        [
            age(self.temperature),
            age(self.mag[0]),
            age(self.mag[1]),
            age(self.mag[2]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(state: &mut InterleaveState, sequence: u8, value: f32, frame_index: u64) -> AuxSlot {
        state.update(SlotValue {
            value,
            sequence,
            frame_index,
            in_range: true,
            crc_valid: true,
        })
    }

    #[test]
    fn test_slot_cycle() {
        let mut state = InterleaveState::new();
        let expected = [
            AuxSlot::Temperature,
            AuxSlot::MagX,
            AuxSlot::MagY,
            AuxSlot::MagZ,
            AuxSlot::Temperature,
        ];
        for (seq, slot) in expected.iter().enumerate() {
            assert_eq!(put(&mut state, seq as u8, seq as f32, seq as u64), *slot);
        }
        // seq 4 overwrote the temperature written by seq 0
        assert_eq!(state.get(AuxSlot::Temperature).unwrap().value, 4.0);
        assert_eq!(state.get(AuxSlot::MagZ).unwrap().sequence, 3);
    }

    #[test]
    fn test_gap_uses_transmitted_sequence() {
        let mut state = InterleaveState::new();
        put(&mut state, 1, 0.5, 0);
        // Frame with sequence 2 lost
        let slot = put(&mut state, 3, -0.25, 1);
        assert_eq!(slot, AuxSlot::MagZ);
        assert!(state.get(AuxSlot::MagY).is_none());
        assert_eq!(state.get(AuxSlot::MagX).unwrap().value, 0.5);
    }

    #[test]
    fn test_wraparound_sequence() {
        assert_eq!(AuxSlot::from_sequence(127), AuxSlot::MagZ);
        assert_eq!(AuxSlot::from_sequence(0), AuxSlot::Temperature);
        assert_eq!(AuxSlot::from_sequence(125), AuxSlot::MagX);
    }

    #[test]
    fn test_view_and_ages() {
        let mut state = InterleaveState::new();
        put(&mut state, 0, 21.5, 10);
        put(&mut state, 1, 0.1, 11);
        put(&mut state, 2, 0.2, 12);

        let view = state.view();
        assert_eq!(view.temperature_c(), Some(21.5));
        assert_eq!(view.mag_gauss(), None);
        assert_eq!(view.ages(15), [Some(5), Some(4), Some(3), None]);

        put(&mut state, 3, 0.3, 13);
        assert_eq!(state.view().mag_gauss(), Some([0.1, 0.2, 0.3]));

        state.clear();
        assert_eq!(state.view(), AuxView::default());
    }

    #[test]
    fn test_untrusted_values_are_kept_but_marked() {
        let mut state = InterleaveState::new();
        put(&mut state, 0, 21.0, 0);
        put(&mut state, 1, 0.1, 1);
        state.update(SlotValue {
            value: 99.0,
            sequence: 4,
            frame_index: 2,
            in_range: false,
            crc_valid: false,
        });

        let view = state.view();
        assert_eq!(view.temperature_c(), Some(99.0));
        assert!(!view.temperature.unwrap().is_trusted());
        assert!(view.mag[0].unwrap().is_trusted());

        let trusted = view.trusted();
        assert_eq!(trusted.temperature_c(), None);
        assert_eq!(trusted.mag[0].map(|s| s.value), Some(0.1));
    }
}
