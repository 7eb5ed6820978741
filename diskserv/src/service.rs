//! Extended-Parameters Reporter
//!
//! Entry point the disk-service dispatcher calls to answer "give me this
//! drive's extended parameters". Orchestrates buffer-size negotiation,
//! the sector-count/geometry policy, and assembly of the output record,
//! delegating descriptor construction to the [`DpteRegion`] builder.
//!
//! The handler is a pure formatting operation over already-resolved
//! drive facts: it performs no I/O, runs to completion synchronously,
//! and produces no partial results on the success path.

use core::fmt;

use log::{debug, warn};
use spin::Mutex;

use crate::dpte::{DpteRegion, FarPtr};
use crate::drive::DriveRecord;
use crate::geometry::{chs_reportable, ChsGeometry, SECTOR_SIZE};
use crate::params::{ExtendedDriveParams, ParamsFlags, ParamsTier};

/// Service construction parameters
///
/// The descriptor feature is a compile-time switch in the legacy
/// firmware; here it is an explicit runtime choice made once at
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    /// Whether the capability descriptor is built at all
    pub dpte_enabled: bool,
    /// Linear base address of the reserved region backing the descriptor
    pub region_base: u32,
    /// Reserved region size in whole kilobytes
    pub region_size_kb: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dpte_enabled: true,
            region_base: 0x9FC00,
            region_size_kb: 1,
        }
    }
}

/// Disk service error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskServiceError {
    /// Caller's declared buffer capacity is below the minimum tier
    InvalidRequestSize,
}

impl fmt::Display for DiskServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskServiceError::InvalidRequestSize => {
                write!(f, "declared buffer capacity below minimum record size")
            }
        }
    }
}

bitflags::bitflags! {
    /// Feature bitmap of the extensions-presence probe
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExtCaps: u16 {
        /// Extended access (read/write/verify/seek) functions
        const EXTENDED_ACCESS = 0x0001;
        /// Removable-media control functions
        const REMOVABLE_CONTROL = 0x0002;
        /// Enhanced disk drive parameter reporting
        const EDD = 0x0004;
    }
}

/// Result of the extensions-presence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionsInfo {
    /// Convention version tag
    pub version: u8,
    /// Supported function groups
    pub caps: ExtCaps,
}

/// Extended disk-parameters service
///
/// One instance per firmware image. The descriptor region is owned
/// exclusively by the service; the dispatcher sees it only through the
/// far pointer placed in the output record.
#[derive(Debug)]
pub struct DiskParamService {
    config: ServiceConfig,
    region: Mutex<DpteRegion>,
}

impl DiskParamService {
    /// Create a service over the configured reserved region
    pub const fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            region: Mutex::new(DpteRegion::new(config.region_base, config.region_size_kb)),
        }
    }

    /// Extended "get drive parameters" query
    ///
    /// Reads the caller's declared capacity from the leading size field
    /// of `buf`, negotiates the record tier, writes the clamped size
    /// back, and fills the record. On error nothing is written and the
    /// buffer contents are unchanged.
    pub fn report(
        &self,
        drive: &DriveRecord,
        buf: &mut [u8],
    ) -> Result<ParamsTier, DiskServiceError> {
        if buf.len() < 2 {
            return Err(DiskServiceError::InvalidRequestSize);
        }
        let requested = u16::from_le_bytes([buf[0], buf[1]]);
        let tier = match ParamsTier::negotiate(requested) {
            Some(tier) => tier,
            None => {
                warn!("extended params request too small: {} bytes", requested);
                return Err(DiskServiceError::InvalidRequestSize);
            }
        };
        // The slice must back the capacity the caller declared
        if buf.len() < tier.size() as usize {
            warn!(
                "declared capacity {} exceeds buffer of {} bytes",
                requested,
                buf.len()
            );
            return Err(DiskServiceError::InvalidRequestSize);
        }

        let dpte_ptr = self.materialize_descriptor(drive);

        let mut flags = ParamsFlags::DMA_BOUNDARY_HANDLED;
        let raw = drive.total_sectors();
        let (chs, total_sectors) = if chs_reportable(raw) {
            // Both size representations are present; they must agree
            // exactly, so the reported count is the triple's product.
            flags |= ParamsFlags::CHS_VALID;
            let chs = drive.chs();
            let total = chs.total_sectors();
            (chs, total)
        } else {
            (ChsGeometry::default(), raw)
        };
        debug!(
            "extended params: tier={} chs_valid={} sectors={}",
            tier.size(),
            flags.contains(ParamsFlags::CHS_VALID),
            total_sectors
        );

        let record = ExtendedDriveParams {
            tier,
            flags,
            chs,
            total_sectors,
            sector_size: SECTOR_SIZE,
            dpte_ptr,
        };
        record.write_to(buf);
        Ok(tier)
    }

    /// Extensions-presence probe
    ///
    /// Callers issue this before the parameters query to learn which
    /// function groups the service answers and under which convention
    /// revision.
    pub fn extensions_check(&self) -> ExtensionsInfo {
        let version = if self.config.dpte_enabled { 0x30 } else { 0x21 };
        ExtensionsInfo {
            version,
            caps: ExtCaps::EXTENDED_ACCESS | ExtCaps::EDD,
        }
    }

    /// Generation counter of the descriptor region
    pub fn descriptor_generation(&self) -> u64 {
        self.region.lock().generation()
    }

    fn materialize_descriptor(&self, drive: &DriveRecord) -> FarPtr {
        if !self.config.dpte_enabled {
            return FarPtr::NULL;
        }
        if !drive.enhanced_mode() {
            return FarPtr::SENTINEL;
        }
        let ptr = self.region.lock().build(drive);
        debug!(
            "capability descriptor built at {:04X}:{:04X}",
            ptr.segment, ptr.offset
        );
        ptr
    }
}
