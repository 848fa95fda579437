pub mod batch;
pub mod cli;
pub mod codec;
pub mod detection;
pub mod error;
pub mod extractor;
pub mod geometry;
pub mod logging;
pub mod naming;
pub mod orientation;
pub mod transform;

pub use batch::{BatchConfig, BatchRunner, BatchSummary, FileOutcome};
pub use cli::Cli;
pub use codec::ImageCodec;
pub use detection::{Boundary, FixedThreshold, Threshold};
pub use error::{Error, Result};
pub use extractor::{CroppedImage, SubphotoExtractor};
pub use geometry::{min_area_rect, AngleConvention, OrientedBox};
pub use naming::{
    IdGenerator, NamingPolicy, SequentialIdGenerator, SubphotoId, TimestampIdGenerator,
};
pub use orientation::{KeepOrientation, LandscapeHeuristic, OrientationPolicy};
