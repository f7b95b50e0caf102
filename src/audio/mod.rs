//! Audio capture, analysis sampling, recording, and playback
//!
//! The capture session feeds a shared ring buffer; the spectral sampler
//! turns that ring into the frequency snapshots the render sinks consume.
//! Recording and playback hang off the same session state.

pub mod device;
pub mod playback;
pub mod recorder;
pub mod sampler;
pub mod session;

pub use playback::{LoopbackMonitor, Player};
pub use recorder::WavRecorder;
pub use sampler::SpectralSampler;
pub use session::{CaptureSession, SharedInput};
