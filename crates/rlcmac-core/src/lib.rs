//! Core utilities for the RLC/MAC block decoder
//!
//! This crate provides fundamental types used across the decoder crates:
//! - BitCursor for bounds-checked, MSB-first bit reads over a borrowed octet buffer
//! - BitString for bit runs that are longer than 64 bits or not octet-aligned
//! - DecodeErr, the recoverable error taxonomy shared by all decode paths
//! - Direction of the radio link
//! - Logging setup and helper macros

pub mod bitcursor;
pub mod debug;
pub mod decode_error;
pub mod direction;

// Re-export commonly used items
pub use bitcursor::{BitCursor, BitString, Crumb};
pub use decode_error::{DecodeErr, ViolationKind};
pub use direction::Direction;
