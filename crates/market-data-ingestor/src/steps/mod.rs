pub mod decoder;
pub mod detector_push;
pub mod filter;

pub use decoder::{decode_frame, DecodeError};
pub use detector_push::DetectorPushStep;
pub use filter::{FilterStep, MarketFilter};
