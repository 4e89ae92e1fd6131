use std::fmt;

/// Communications Link Control Word, the FARM-1 report carried in the downlink
///
/// The report value N(R) is the sequence number of the next AD frame the receiver expects, which
/// implicitly acknowledges every frame before it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Clcw {
    /// Virtual channel the report refers to
    pub vc_id: u8,
    /// COP in effect, 1 for COP-1
    pub cop_in_effect: u8,
    /// The physical layer reports no RF available
    pub no_rf_available: bool,
    /// The physical layer reports no bit lock
    pub no_bit_lock: bool,
    /// The FARM is in lockout and rejects all AD frames until unlocked
    pub lockout: bool,
    /// The FARM cannot accept frames for now
    pub wait: bool,
    /// The FARM asks for the retransmission of the frames starting at N(R)
    pub retransmit: bool,
    /// Two least significant bits of the FARM-B (bypass) frame counter
    pub farm_b_counter: u8,
    /// N(R), the next expected frame sequence number
    pub report_value: u8,
}

const VC_ID_SHIFT: u32 = 18;
const COP_SHIFT: u32 = 24;
const NO_RF_BIT: u32 = 1 << 15;
const NO_BIT_LOCK_BIT: u32 = 1 << 14;
const LOCKOUT_BIT: u32 = 1 << 13;
const WAIT_BIT: u32 = 1 << 12;
const RETRANSMIT_BIT: u32 = 1 << 11;
const FARM_B_SHIFT: u32 = 9;

impl Clcw {
    /// A plain report for `vc_id` with all flags clear
    pub fn new(vc_id: u8, report_value: u8) -> Self {
        Self {
            vc_id,
            cop_in_effect: 1,
            report_value,
            ..Self::default()
        }
    }

    /// Set the lockout flag
    pub fn with_lockout(mut self, value: bool) -> Self {
        self.lockout = value;
        self
    }

    /// Set the wait flag
    pub fn with_wait(mut self, value: bool) -> Self {
        self.wait = value;
        self
    }

    /// Set the retransmit flag
    pub fn with_retransmit(mut self, value: bool) -> Self {
        self.retransmit = value;
        self
    }

    /// Decode the 32-bit word as laid out in CCSDS 232.0-B-3 section 4.2.1.4
    ///
    /// Control word type, version and status fields are not checked.
    pub fn from_word(word: u32) -> Self {
        Self {
            vc_id: ((word >> VC_ID_SHIFT) & 0x3f) as u8,
            cop_in_effect: ((word >> COP_SHIFT) & 0x3) as u8,
            no_rf_available: word & NO_RF_BIT != 0,
            no_bit_lock: word & NO_BIT_LOCK_BIT != 0,
            lockout: word & LOCKOUT_BIT != 0,
            wait: word & WAIT_BIT != 0,
            retransmit: word & RETRANSMIT_BIT != 0,
            farm_b_counter: ((word >> FARM_B_SHIFT) & 0x3) as u8,
            report_value: (word & 0xff) as u8,
        }
    }

    /// Encode into the 32-bit word, with control word type, version and status set to zero
    pub fn to_word(&self) -> u32 {
        let mut word = u32::from(self.cop_in_effect & 0x3) << COP_SHIFT
            | u32::from(self.vc_id & 0x3f) << VC_ID_SHIFT
            | u32::from(self.farm_b_counter & 0x3) << FARM_B_SHIFT
            | u32::from(self.report_value);
        for (flag, bit) in [
            (self.no_rf_available, NO_RF_BIT),
            (self.no_bit_lock, NO_BIT_LOCK_BIT),
            (self.lockout, LOCKOUT_BIT),
            (self.wait, WAIT_BIT),
            (self.retransmit, RETRANSMIT_BIT),
        ] {
            if flag {
                word |= bit;
            }
        }
        word
    }
}

impl From<u32> for Clcw {
    fn from(word: u32) -> Self {
        Self::from_word(word)
    }
}

impl fmt::Debug for Clcw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Clcw(vc={}, lockout={}, wait={}, retransmit={}, nR={})",
            self.vc_id,
            self.lockout as u8,
            self.wait as u8,
            self.retransmit as u8,
            self.report_value
        )
    }
}
