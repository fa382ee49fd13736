//! Venue implementations.
//!
//! Only the simulated [`PaperVenue`] ships here; exchange clients implement
//! [`trading_core::traits::Venue`] the same way.

mod paper;

pub use paper::PaperVenue;
