pub mod device;
pub mod output;
pub mod queue;

pub use output::{CpalDiscovery, CpalOutput};
pub use queue::SampleQueue;
