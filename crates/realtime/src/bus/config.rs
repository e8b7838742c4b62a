/// Per-listener buffer used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Comments a listener may have pending before further deliveries to it
    /// are dropped.
    pub buffer_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}
