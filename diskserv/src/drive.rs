//! Drive Record
//!
//! Read-only view of a drive's resolved geometry and capability facts.
//! The drive-management subsystem detects the hardware and fills this in;
//! the disk service only formats what it finds here.

use crate::geometry::ChsGeometry;

/// Mask for the 48 significant bits of a logical sector count
pub const LBA48_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Translate-mode bits
///
/// A non-zero value means the legacy triple is a translated view of the
/// native geometry rather than the native geometry itself.
pub mod translate_mode {
    /// No translation; the legacy triple is native
    pub const NONE: u8 = 0x00;
    /// Bit-shift translation
    pub const BIT_SHIFT: u8 = 0x01;
    /// LBA-assisted translation
    pub const LBA_ASSISTED: u8 = 0x02;
}

/// Drive interface variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveVariant {
    /// Fixed-disk command set
    #[default]
    Standard,
    /// Packet-interface command set (optical and other removable class)
    Packet,
}

bitflags::bitflags! {
    /// Transfer/command capability bits resolved by drive detection
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DriveCaps: u16 {
        /// Enhanced-mode reporting (extended parameters) supported
        const ENHANCED_MODE = 0x0001;
        /// Advanced PIO timings available
        const ADVANCED_PIO = 0x0002;
        /// Multiword DMA transfers available
        const DMA = 0x0004;
        /// 48-bit logical addressing available
        const LBA48 = 0x0008;
    }
}

/// Resolved per-drive geometry and capability facts
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveRecord {
    /// Legacy cylinder count
    pub cylinders: u16,
    /// Legacy head count
    pub heads: u16,
    /// Legacy sectors per track
    pub sectors_per_track: u16,
    /// Raw logical sector count (48 significant bits)
    pub sectors: u64,
    /// Interface variant
    pub variant: DriveVariant,
    /// Translate-mode bits, see [`translate_mode`]
    pub translate: u8,
    /// Command block base port
    pub io_base: u16,
    /// Control block base port
    pub control_base: u16,
    /// Drive-select register image
    pub select: u8,
    /// Interrupt request line
    pub irq: u8,
    /// Negotiated transfer block size in sectors
    pub block_size: u8,
    /// DMA channel/type byte
    pub dma: u8,
    /// PIO mode byte
    pub pio: u8,
    /// Host controller identifier (zero when the controller could not be
    /// identified)
    pub controller_id: u16,
    /// Capability bits
    pub caps: DriveCaps,
}

impl DriveRecord {
    /// Raw logical sector count, clipped to its 48 significant bits
    pub fn total_sectors(&self) -> u64 {
        self.sectors & LBA48_MASK
    }

    /// Legacy geometry triple, widened to the reporting field widths
    pub fn chs(&self) -> ChsGeometry {
        ChsGeometry::new(
            self.cylinders as u32,
            self.heads as u32,
            self.sectors_per_track as u32,
        )
    }

    /// Whether the drive supports enhanced-mode reporting
    pub fn enhanced_mode(&self) -> bool {
        self.caps.contains(DriveCaps::ENHANCED_MODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_count_clipped_to_48_bits() {
        let drive = DriveRecord {
            sectors: 0xABCD_0000_0000_1234,
            ..Default::default()
        };
        assert_eq!(drive.total_sectors(), 0x0000_0000_0000_1234);

        let drive = DriveRecord {
            sectors: LBA48_MASK,
            ..Default::default()
        };
        assert_eq!(drive.total_sectors(), LBA48_MASK);
    }

    #[test]
    fn test_chs_widening() {
        let drive = DriveRecord {
            cylinders: 16383,
            heads: 16,
            sectors_per_track: 63,
            ..Default::default()
        };
        let chs = drive.chs();
        assert_eq!(chs.cylinders, 16383);
        assert_eq!(chs.heads, 16);
        assert_eq!(chs.sectors_per_track, 63);
    }

    #[test]
    fn test_enhanced_mode_bit() {
        let mut drive = DriveRecord::default();
        assert!(!drive.enhanced_mode());
        drive.caps |= DriveCaps::ENHANCED_MODE;
        assert!(drive.enhanced_mode());
    }
}
