//! On-wire word format.
//!
//! Every word is a 32-bit pattern carrying one IEEE-754 binary32 value. The
//! compute path never sees words; conversion happens only at the stream edges.

/// Reinterpret a float as its binary32 bit pattern.
#[must_use]
pub fn encode_f32(value: f32) -> u32 {
    value.to_bits()
}

/// Reinterpret a binary32 bit pattern as a float. No range checking.
#[must_use]
pub fn decode_f32(word: u32) -> f32 {
    f32::from_bits(word)
}

/// One word on a stream channel plus the end-of-message flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamWord {
    /// Raw binary32 bit pattern.
    pub data: u32,
    /// End-of-message flag.
    pub last: bool,
}

impl StreamWord {
    /// Word carrying `value`, end-of-message flag clear.
    #[must_use]
    pub fn from_f32(value: f32) -> Self {
        Self {
            data: encode_f32(value),
            last: false,
        }
    }

    /// Same word with the end-of-message flag set to `last`.
    #[must_use]
    pub const fn with_last(self, last: bool) -> Self {
        Self {
            data: self.data,
            last,
        }
    }

    /// Payload as a float.
    #[must_use]
    pub fn value(&self) -> f32 {
        decode_f32(self.data)
    }
}

/// All four byte lanes valid.
pub const ALL_BYTES_VALID: u8 = 0xF;

/// Legacy 32-bit AXI-Stream beat with 1-bit `user`/`id`/`dest` side-band.
///
/// Only needed when bridging to a transport that still carries these fields.
/// The kernel itself only produces data and `last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisBeat {
    /// TDATA.
    pub data: u32,
    /// TKEEP, one bit per byte lane.
    pub keep: u8,
    /// TSTRB, one bit per byte lane.
    pub strb: u8,
    /// TUSER.
    pub user: bool,
    /// TID.
    pub id: bool,
    /// TDEST.
    pub dest: bool,
    /// TLAST.
    pub last: bool,
}

impl From<StreamWord> for AxisBeat {
    fn from(w: StreamWord) -> Self {
        Self {
            data: w.data,
            keep: ALL_BYTES_VALID,
            strb: ALL_BYTES_VALID,
            user: false,
            id: false,
            dest: false,
            last: w.last,
        }
    }
}

impl From<AxisBeat> for StreamWord {
    fn from(b: AxisBeat) -> Self {
        Self {
            data: b.data,
            last: b.last,
        }
    }
}
