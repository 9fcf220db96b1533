//! Building blocks shared by the pipeline and the transfer session

pub mod buffer;
pub mod clock;
pub mod pattern;
pub mod pool;
pub mod time;
