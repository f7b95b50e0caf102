/// Runtime configuration for the live monitor
#[derive(Clone)]
pub struct MonitorConfig {
    /// Input device name fragment; default device when `None`
    pub input: Option<String>,
    /// Output device name fragment for playback and loopback
    pub output: Option<String>,
    /// Start with the mirror overlay visible
    pub mirror: bool,
    /// Seconds per frame for the render loop
    pub frame_step: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            mirror: false,
            frame_step: 0.016,
        }
    }
}
