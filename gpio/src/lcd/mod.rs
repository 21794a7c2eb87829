//! LCD controller drivers.

pub mod t6963c;
