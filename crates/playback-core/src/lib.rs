//! Playback core: the sample-buffer container moved between pipeline stages
//! and the output-selection policy that decides which sink receives it.

pub mod buffer;
pub mod discovery;
pub mod null;
pub mod output;
pub mod prefs;
pub mod selector;

pub use buffer::{BufferError, SampleBuffer, StoreOwnership};
pub use discovery::{OutputDiscovery, OwnedOutput, SharedOutput};
pub use null::NullOutput;
pub use output::{AudioOutput, BufferProvider, Device, OutputState};
pub use prefs::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use selector::OutputSelector;
