//! Extended Parameters Record
//!
//! The size-negotiated result record of the extended "get drive
//! parameters" query. Offsets and field widths are an external
//! compatibility contract (the Enhanced Disk Drive convention):
//!
//! ```text
//! offset  size  field
//!   0      2    record size (negotiated tier, written back)
//!   2      2    status flags
//!   4      4    cylinders
//!   8      4    heads
//!  12      4    sectors per track
//!  16      8    total sector count
//!  24      2    sector size                    -- 26-byte base tier
//!  26      4    capability descriptor pointer  -- 30-byte tier only
//! ```

use crate::dpte::FarPtr;
use crate::geometry::ChsGeometry;

/// Negotiated record size tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ParamsTier {
    /// Sector count and geometry only
    Base = 26,
    /// Base record plus the capability descriptor pointer
    Descriptor = 30,
}

impl ParamsTier {
    /// Smallest capacity a caller may declare
    pub const MIN_SIZE: u16 = ParamsTier::Base as u16;

    /// Record size in bytes
    pub const fn size(self) -> u16 {
        self as u16
    }

    /// Largest tier not exceeding the caller's declared capacity
    pub fn negotiate(requested: u16) -> Option<ParamsTier> {
        if requested >= ParamsTier::Descriptor.size() {
            Some(ParamsTier::Descriptor)
        } else if requested >= ParamsTier::Base.size() {
            Some(ParamsTier::Base)
        } else {
            None
        }
    }
}

bitflags::bitflags! {
    /// Status flags word of the extended parameters record
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParamsFlags: u16 {
        /// DMA boundary errors are handled transparently by the firmware
        const DMA_BOUNDARY_HANDLED = 0x0001;
        /// The legacy geometry fields are valid
        const CHS_VALID = 0x0002;
        /// Media is removable
        const REMOVABLE = 0x0004;
        /// Write with verify supported
        const WRITE_VERIFY = 0x0008;
        /// Media change notification supported
        const CHANGE_NOTIFY = 0x0010;
        /// Media is lockable
        const LOCKABLE = 0x0020;
        /// No media present; geometry reflects maximums
        const NO_MEDIA = 0x0040;
    }
}

/// In-memory form of the extended parameters record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedDriveParams {
    /// Negotiated size tier
    pub tier: ParamsTier,
    /// Status flags
    pub flags: ParamsFlags,
    /// Legacy geometry (zeroed when not reported)
    pub chs: ChsGeometry,
    /// Total sector count, top 16 bits always zero
    pub total_sectors: u64,
    /// Sector size in bytes
    pub sector_size: u16,
    /// Capability descriptor pointer (serialized in the 30-byte tier only)
    pub dpte_ptr: FarPtr,
}

impl ExtendedDriveParams {
    /// Serialize into `out`, which must hold at least `tier.size()` bytes
    ///
    /// Returns the number of bytes written.
    pub fn write_to(&self, out: &mut [u8]) -> usize {
        let size = self.tier.size();
        out[0..2].copy_from_slice(&size.to_le_bytes());
        out[2..4].copy_from_slice(&self.flags.bits().to_le_bytes());
        out[4..8].copy_from_slice(&self.chs.cylinders.to_le_bytes());
        out[8..12].copy_from_slice(&self.chs.heads.to_le_bytes());
        out[12..16].copy_from_slice(&self.chs.sectors_per_track.to_le_bytes());
        out[16..24].copy_from_slice(&self.total_sectors.to_le_bytes());
        out[24..26].copy_from_slice(&self.sector_size.to_le_bytes());
        if self.tier == ParamsTier::Descriptor {
            out[26..30].copy_from_slice(&self.dpte_ptr.to_wire().to_le_bytes());
        }
        size as usize
    }

    /// Rebuild the in-memory form from a serialized record
    ///
    /// Returns `None` when the buffer is short or the size field names
    /// neither tier.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }
        let size = u16::from_le_bytes([data[0], data[1]]);
        let tier = match size {
            s if s == ParamsTier::Base.size() => ParamsTier::Base,
            s if s == ParamsTier::Descriptor.size() => ParamsTier::Descriptor,
            _ => return None,
        };
        if data.len() < tier.size() as usize {
            return None;
        }

        let dpte_ptr = if tier == ParamsTier::Descriptor {
            FarPtr::from_wire(u32::from_le_bytes([data[26], data[27], data[28], data[29]]))
        } else {
            FarPtr::NULL
        };

        Some(Self {
            tier,
            flags: ParamsFlags::from_bits_retain(u16::from_le_bytes([data[2], data[3]])),
            chs: ChsGeometry::new(
                u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
                u32::from_le_bytes([data[8], data[9], data[10], data[11]]),
                u32::from_le_bytes([data[12], data[13], data[14], data[15]]),
            ),
            total_sectors: u64::from_le_bytes([
                data[16], data[17], data[18], data[19], data[20], data[21], data[22], data[23],
            ]),
            sector_size: u16::from_le_bytes([data[24], data[25]]),
            dpte_ptr,
        })
    }
}
