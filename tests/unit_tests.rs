//! Component tests aggregated into one test binary.

mod unit;
