//! Drive Parameter Table Extension (DPTE)
//!
//! The 16-byte checksummed capability descriptor handed to enhanced-mode
//! aware callers. Layout and checksum follow the Enhanced Disk Drive
//! convention bit-for-bit:
//!
//! ```text
//! offset  size  field
//!   0      2    command block base port
//!   2      2    control block base port
//!   4      1    drive-select register image
//!   5      1    vendor reserved (always zero)
//!   6      1    interrupt request line
//!   7      1    transfer block size in sectors
//!   8      1    DMA channel/type
//!   9      1    PIO mode
//!  10      2    option flags
//!  12      2    reserved (always zero)
//!  14      1    extension revision
//!  15      1    checksum (byte-sum of all 16 bytes is 0 mod 256)
//! ```
//!
//! Exactly one descriptor slot exists per service instance, occupying the
//! last 16 bytes of the configured reserved region. Every build
//! overwrites the previous contents.

use crate::drive::{translate_mode, DriveCaps, DriveRecord, DriveVariant};

/// Descriptor length in bytes
pub const DPTE_SIZE: usize = 16;

/// Fixed extension revision
pub const DPTE_REVISION: u8 = 0x11;

bitflags::bitflags! {
    /// Option flags word of the descriptor
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DpteOptions: u16 {
        /// Fast PIO accesses enabled
        const FAST_PIO = 1 << 0;
        /// Fast DMA accesses enabled
        const FAST_DMA = 1 << 1;
        /// Block PIO (multi-sector) transfers enabled
        const BLOCK_MODE = 1 << 2;
        /// CHS translation enabled
        const CHS_TRANSLATION = 1 << 3;
        /// LBA translation enabled
        const LBA_TRANSLATION = 1 << 4;
        /// Removable media
        const REMOVABLE = 1 << 5;
        /// Packet-interface device
        const PACKET_INTERFACE = 1 << 6;
        /// 32-bit transfer mode
        const TRANSFER_32BIT = 1 << 7;
        /// LBA-assisted translation type
        const LBA_ASSISTED = 1 << 9;
    }
}

/// Real-mode segment:offset pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarPtr {
    /// Segment part
    pub segment: u16,
    /// Offset part
    pub offset: u16,
}

impl FarPtr {
    /// "No descriptor" sentinel, distinguishable from any real address
    pub const SENTINEL: FarPtr = FarPtr {
        segment: 0xFFFF,
        offset: 0xFFFF,
    };

    /// Null pointer reported when the descriptor feature is disabled
    pub const NULL: FarPtr = FarPtr {
        segment: 0,
        offset: 0,
    };

    /// Build from a linear address below 1 MiB
    pub const fn from_linear(addr: u32) -> FarPtr {
        FarPtr {
            segment: (addr >> 4) as u16,
            offset: (addr & 0xF) as u16,
        }
    }

    /// Linear address this pointer resolves to
    pub const fn to_linear(self) -> u32 {
        ((self.segment as u32) << 4) + self.offset as u32
    }

    /// Wire form: offset in the low word, segment in the high word
    pub const fn to_wire(self) -> u32 {
        ((self.segment as u32) << 16) | self.offset as u32
    }

    /// Rebuild from the wire form
    pub const fn from_wire(raw: u32) -> FarPtr {
        FarPtr {
            segment: (raw >> 16) as u16,
            offset: raw as u16,
        }
    }

    /// Check for the "no descriptor" sentinel
    pub fn is_sentinel(&self) -> bool {
        *self == FarPtr::SENTINEL
    }
}

/// In-memory form of the descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveParamTableExt {
    /// Command block base port
    pub io_base: u16,
    /// Control block base port
    pub control_base: u16,
    /// Drive-select register image
    pub select: u8,
    /// Vendor reserved byte, always zero
    pub vendor_reserved: u8,
    /// Interrupt request line
    pub irq: u8,
    /// Transfer block size in sectors
    pub block_size: u8,
    /// DMA channel/type byte
    pub dma: u8,
    /// PIO mode byte
    pub pio: u8,
    /// Option flags
    pub options: DpteOptions,
    /// Reserved word, always zero
    pub reserved: u16,
    /// Extension revision
    pub revision: u8,
}

impl DriveParamTableExt {
    /// Derive the descriptor for a drive
    ///
    /// The checksum byte is not part of the in-memory form; it is
    /// computed when the descriptor is serialized.
    pub fn for_drive(drive: &DriveRecord) -> Self {
        let mut options = match drive.variant {
            DriveVariant::Standard => DpteOptions::LBA_TRANSLATION,
            DriveVariant::Packet => DpteOptions::PACKET_INTERFACE | DpteOptions::TRANSFER_32BIT,
        };

        if drive.block_size > 1 {
            options |= DpteOptions::BLOCK_MODE;
        }

        if drive.caps.contains(DriveCaps::ADVANCED_PIO) && drive.controller_id != 0 {
            options |= DpteOptions::FAST_PIO;
        }

        if drive.translate != translate_mode::NONE {
            options |= DpteOptions::CHS_TRANSLATION;
            if drive.translate & translate_mode::LBA_ASSISTED != 0 {
                options |= DpteOptions::LBA_ASSISTED;
            }
        }

        Self {
            io_base: drive.io_base,
            control_base: drive.control_base,
            select: drive.select,
            vendor_reserved: 0,
            irq: drive.irq,
            block_size: drive.block_size,
            dma: drive.dma,
            pio: drive.pio,
            options,
            reserved: 0,
            revision: DPTE_REVISION,
        }
    }

    /// Serialize to the 16-byte wire form
    ///
    /// The checksum byte is chosen so the byte-sum of the whole record is
    /// zero modulo 256.
    pub fn to_bytes(&self) -> [u8; DPTE_SIZE] {
        let mut out = [0u8; DPTE_SIZE];
        out[0..2].copy_from_slice(&self.io_base.to_le_bytes());
        out[2..4].copy_from_slice(&self.control_base.to_le_bytes());
        out[4] = self.select;
        out[5] = self.vendor_reserved;
        out[6] = self.irq;
        out[7] = self.block_size;
        out[8] = self.dma;
        out[9] = self.pio;
        out[10..12].copy_from_slice(&self.options.bits().to_le_bytes());
        out[12..14].copy_from_slice(&self.reserved.to_le_bytes());
        out[14] = self.revision;

        let sum = out[..DPTE_SIZE - 1]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        out[DPTE_SIZE - 1] = sum.wrapping_neg();
        out
    }

    /// Rebuild the in-memory form from a serialized descriptor
    pub fn parse(bytes: &[u8; DPTE_SIZE]) -> Self {
        Self {
            io_base: u16::from_le_bytes([bytes[0], bytes[1]]),
            control_base: u16::from_le_bytes([bytes[2], bytes[3]]),
            select: bytes[4],
            vendor_reserved: bytes[5],
            irq: bytes[6],
            block_size: bytes[7],
            dma: bytes[8],
            pio: bytes[9],
            options: DpteOptions::from_bits_retain(u16::from_le_bytes([bytes[10], bytes[11]])),
            reserved: u16::from_le_bytes([bytes[12], bytes[13]]),
            revision: bytes[14],
        }
    }

    /// Verify the checksum of a serialized descriptor
    pub fn checksum_ok(bytes: &[u8; DPTE_SIZE]) -> bool {
        bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
    }
}

/// Single-owner buffer backing the descriptor's reserved region
///
/// The region's base and size come from configuration; the descriptor
/// occupies the region's last 16 bytes. A generation counter tracks
/// rebuilds so stale references can be detected by the embedder.
#[derive(Debug)]
pub struct DpteRegion {
    base: u32,
    size_kb: u16,
    bytes: [u8; DPTE_SIZE],
    generation: u64,
}

impl DpteRegion {
    /// Create a region of `size_kb` whole kilobytes at linear `base`
    pub const fn new(base: u32, size_kb: u16) -> Self {
        Self {
            base,
            size_kb,
            bytes: [0; DPTE_SIZE],
            generation: 0,
        }
    }

    /// Linear address of the descriptor slot (last 16 bytes of the region)
    pub fn descriptor_addr(&self) -> u32 {
        self.base + self.size_kb as u32 * 1024 - DPTE_SIZE as u32
    }

    /// Build the descriptor for `drive`, overwriting any previous contents
    pub fn build(&mut self, drive: &DriveRecord) -> FarPtr {
        self.bytes = DriveParamTableExt::for_drive(drive).to_bytes();
        self.generation += 1;
        FarPtr::from_linear(self.descriptor_addr())
    }

    /// Serialized contents of the most recent build
    pub fn bytes(&self) -> &[u8; DPTE_SIZE] {
        &self.bytes
    }

    /// Number of builds performed on this region
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ata_drive() -> DriveRecord {
        DriveRecord {
            io_base: 0x1F0,
            control_base: 0x3F6,
            select: 0xA0,
            irq: 14,
            block_size: 16,
            dma: 0x20,
            pio: 0x04,
            controller_id: 0x8086,
            caps: DriveCaps::ENHANCED_MODE | DriveCaps::ADVANCED_PIO,
            ..Default::default()
        }
    }

    #[test]
    fn test_checksum_zero_for_option_matrix() {
        // Every combination of the inputs that steer the options word
        for &advanced_pio in &[false, true] {
            for &controller_id in &[0u16, 0x8086] {
                for &translate in &[
                    translate_mode::NONE,
                    translate_mode::BIT_SHIFT,
                    translate_mode::BIT_SHIFT | translate_mode::LBA_ASSISTED,
                ] {
                    for &block_size in &[0u8, 1, 16] {
                        let mut drive = ata_drive();
                        drive.caps = if advanced_pio {
                            DriveCaps::ADVANCED_PIO
                        } else {
                            DriveCaps::empty()
                        };
                        drive.controller_id = controller_id;
                        drive.translate = translate;
                        drive.block_size = block_size;

                        let bytes = DriveParamTableExt::for_drive(&drive).to_bytes();
                        assert!(
                            DriveParamTableExt::checksum_ok(&bytes),
                            "checksum broken for pio={} id={:#x} xlat={:#x} blk={}",
                            advanced_pio,
                            controller_id,
                            translate,
                            block_size
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_wire_layout() {
        let bytes = DriveParamTableExt::for_drive(&ata_drive()).to_bytes();
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 0x1F0);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 0x3F6);
        assert_eq!(bytes[4], 0xA0);
        assert_eq!(bytes[5], 0); // vendor reserved is always zero
        assert_eq!(bytes[6], 14);
        assert_eq!(bytes[7], 16);
        assert_eq!(bytes[8], 0x20);
        assert_eq!(bytes[9], 0x04);
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 0);
        assert_eq!(bytes[14], DPTE_REVISION);
    }

    #[test]
    fn test_options_policy_standard() {
        let dpte = DriveParamTableExt::for_drive(&ata_drive());
        assert!(dpte.options.contains(DpteOptions::LBA_TRANSLATION));
        assert!(dpte.options.contains(DpteOptions::BLOCK_MODE));
        assert!(dpte.options.contains(DpteOptions::FAST_PIO));
        assert!(!dpte.options.contains(DpteOptions::CHS_TRANSLATION));
        assert!(!dpte.options.contains(DpteOptions::PACKET_INTERFACE));
    }

    #[test]
    fn test_options_policy_packet_variant() {
        let mut drive = ata_drive();
        drive.variant = DriveVariant::Packet;
        let dpte = DriveParamTableExt::for_drive(&drive);
        assert!(dpte.options.contains(DpteOptions::PACKET_INTERFACE));
        assert!(dpte.options.contains(DpteOptions::TRANSFER_32BIT));
        assert!(!dpte.options.contains(DpteOptions::LBA_TRANSLATION));
    }

    #[test]
    fn test_fast_pio_needs_identified_controller() {
        let mut drive = ata_drive();
        drive.controller_id = 0;
        let dpte = DriveParamTableExt::for_drive(&drive);
        assert!(!dpte.options.contains(DpteOptions::FAST_PIO));

        drive.controller_id = 0x8086;
        drive.caps -= DriveCaps::ADVANCED_PIO;
        let dpte = DriveParamTableExt::for_drive(&drive);
        assert!(!dpte.options.contains(DpteOptions::FAST_PIO));
    }

    #[test]
    fn test_translation_bits() {
        let mut drive = ata_drive();
        drive.translate = translate_mode::BIT_SHIFT;
        let dpte = DriveParamTableExt::for_drive(&drive);
        assert!(dpte.options.contains(DpteOptions::CHS_TRANSLATION));
        assert!(!dpte.options.contains(DpteOptions::LBA_ASSISTED));

        drive.translate = translate_mode::BIT_SHIFT | translate_mode::LBA_ASSISTED;
        let dpte = DriveParamTableExt::for_drive(&drive);
        assert!(dpte.options.contains(DpteOptions::CHS_TRANSLATION));
        assert!(dpte.options.contains(DpteOptions::LBA_ASSISTED));
    }

    #[test]
    fn test_block_mode_only_above_one_sector() {
        for (block_size, expect) in [(0u8, false), (1, false), (2, true), (16, true)] {
            let mut drive = ata_drive();
            drive.block_size = block_size;
            let dpte = DriveParamTableExt::for_drive(&drive);
            assert_eq!(dpte.options.contains(DpteOptions::BLOCK_MODE), expect);
        }
    }

    #[test]
    fn test_roundtrip() {
        let dpte = DriveParamTableExt::for_drive(&ata_drive());
        let bytes = dpte.to_bytes();
        assert_eq!(DriveParamTableExt::parse(&bytes), dpte);
    }

    #[test]
    fn test_region_placement() {
        let region = DpteRegion::new(0x9FC00, 1);
        assert_eq!(region.descriptor_addr(), 0x9FC00 + 1024 - 16);

        let ptr = FarPtr::from_linear(region.descriptor_addr());
        assert_eq!(ptr.to_linear(), region.descriptor_addr());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let drive = ata_drive();
        let mut region = DpteRegion::new(0x9FC00, 1);
        let first_ptr = region.build(&drive);
        let first = *region.bytes();
        let second_ptr = region.build(&drive);
        assert_eq!(first, *region.bytes());
        assert_eq!(first_ptr, second_ptr);
        assert_eq!(region.generation(), 2);
    }

    #[test]
    fn test_rebuild_overwrites_previous_drive() {
        let mut region = DpteRegion::new(0x9FC00, 1);
        region.build(&ata_drive());
        let first = *region.bytes();

        let mut other = ata_drive();
        other.io_base = 0x170;
        other.control_base = 0x376;
        other.irq = 15;
        region.build(&other);
        assert_ne!(first, *region.bytes());
        assert_eq!(u16::from_le_bytes([region.bytes()[0], region.bytes()[1]]), 0x170);
    }

    #[test]
    fn test_far_ptr_forms() {
        let ptr = FarPtr::from_linear(0x9FFF0);
        assert_eq!(ptr.segment, 0x9FFF);
        assert_eq!(ptr.offset, 0);
        assert_eq!(FarPtr::from_wire(ptr.to_wire()), ptr);
        assert!(FarPtr::SENTINEL.is_sentinel());
        assert!(!ptr.is_sentinel());
        assert_eq!(FarPtr::SENTINEL.to_wire(), 0xFFFF_FFFF);
        assert_eq!(FarPtr::NULL.to_wire(), 0);
    }
}
