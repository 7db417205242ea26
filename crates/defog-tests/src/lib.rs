//! Integration test crate for Defog.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on multiple defog crates to verify they work together.

#[cfg(test)]
mod pipeline;

#[cfg(test)]
mod haze;

#[cfg(test)]
mod media;
