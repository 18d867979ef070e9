pub mod common;
pub mod logging;
pub mod seed;
