//! Extended Disk-Parameters Service
//!
//! Answers the legacy firmware disk-service "get extended drive
//! parameters" query for a block-storage adapter. The service reconciles
//! independently-sourced views of a drive's size (the raw logical sector
//! count, the legacy cylinder/head/sector triple, and the caller's
//! size-negotiated buffer) into one self-consistent record, and
//! serializes the 16-byte checksummed capability descriptor that
//! enhanced-mode aware callers consume.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              Query Dispatcher                   │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌─────────────────────────────────────────────────┐
//! │              DiskParamService                   │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐    │
//! │  │   Size    │  │ Geometry  │  │   DPTE    │    │
//! │  │ Negotiate │  │  Policy   │  │  Builder  │    │
//! │  └───────────┘  └───────────┘  └───────────┘    │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌─────────────────────────────────────────────────┐
//! │     DriveRecord (drive-management subsystem)    │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Binary layouts and the descriptor checksum follow the Enhanced Disk
//! Drive convention bit-for-bit; the record schemas live in [`params`]
//! and [`dpte`] and are validated by round-trip tests. The service
//! discovers nothing itself: drive facts arrive resolved in a
//! [`DriveRecord`] and are only formatted here.

#![no_std]

pub mod dpte;
pub mod drive;
pub mod geometry;
pub mod legacy;
pub mod params;
pub mod service;

pub use dpte::*;
pub use drive::*;
pub use geometry::*;
pub use legacy::*;
pub use params::*;
pub use service::*;
