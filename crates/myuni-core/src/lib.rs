//! Core types and transformation engines for the MyUni student API.
//!
//! Two independent pipelines live here:
//!
//! - raw enrolment tree → degree summaries, credit totals and student info
//!   ([`degrees`], [`credits`], [`info`]);
//! - raw calendar records → per-session study weeks ([`calendar`],
//!   [`weeks`]).
//!
//! Both are pure and hold no state between calls. This crate is free of HTTP
//! dependencies; collaborators are reached through the traits in [`source`].

pub mod calendar;
pub mod credits;
pub mod degrees;
pub mod enrolment;
pub mod error;
pub mod info;
pub mod normalize;
pub mod service;
pub mod source;
pub mod weeks;


pub use error::{Error, Result};
