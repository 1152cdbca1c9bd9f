//! Peers of the clock controller, each reached only through the
//! [`Master`](crate::Master) entry points.

pub mod nixie;
pub mod oled;
pub mod power;
pub mod rtc;
