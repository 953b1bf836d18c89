//! Simulated address map of the accelerator.
//!
//! The performance model never stores pixel or primitive data; addresses only exist so
//! that the cache and the DRAM model see realistic line streams.  The map mirrors the
//! hardware's flat layout: raw scene buffers, the double-buffered projection store, and
//! the per-tile reuse/new order buffers.

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;

pub const MHZ: u64 = 1_000_000;

pub const RAW_POSITION_BASE: u64 = 0x000_0000;
pub const RAW_ATTRIBUTE_BASE: u64 = 0x300_0000;
pub const PREV_PROJECTION_BASE: u64 = 0x600_0000;
pub const CURR_PROJECTION_BASE: u64 = 0x900_0000;
pub const REUSE_BASE: u64 = 0xc00_0000;
pub const NEW_BASE: u64 = 0xf00_0000;

/// x, y, z: 2 B each.
pub const RAW_POSITION_SIZE: u64 = 6;

/// Opacity (2 B), scale x/y/z (2 B each), quaternion w/x/y/z (2 B each),
/// SH coefficients for RGB (3 * 16 * 2 B).
pub const RAW_ATTRIBUTE_SIZE: u64 = 2 + 6 + 8 + 96;

/// Depth (2 B), radius (2 B), screen position x/y (2 B each), conic c00/c01/c11 and
/// opacity (2 B each), RGB (2 B each).
pub const PROJECTION_ENTRY_SIZE: u64 = 2 + 2 + 4 + 8 + 6;

pub const NEW_ENTRY_SIZE: u64 = 8;
pub const REUSE_ENTRY_SIZE: u64 = 8;

/// Fixed per-tile stride of the order buffers.
pub const MAX_PRIMITIVES_PER_TILE: u64 = 8198;

#[inline]
pub fn align_address(address: u64, line: u64) -> u64 {
    (address / line) * line
}

#[inline]
pub fn new_tile_base(tile_id: u64) -> u64 {
    NEW_BASE + tile_id * MAX_PRIMITIVES_PER_TILE * NEW_ENTRY_SIZE
}

#[inline]
pub fn reuse_tile_base(tile_id: u64) -> u64 {
    REUSE_BASE + tile_id * MAX_PRIMITIVES_PER_TILE * REUSE_ENTRY_SIZE
}
