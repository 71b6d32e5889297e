use common::hilbert::MAX_ORDER;

#[derive(Debug, Clone)]
pub struct Config {
    /// Bits per axis of the Hilbert key used by the sort pass.
    pub hilbert_order: u32,
    pub sort_on_prepare: bool,
    /// Log the duration of each maintenance pass at info level.
    pub profile_summary: bool,
}

impl Config {
    pub(crate) fn normalized(mut self) -> Self {
        self.hilbert_order = self.hilbert_order.clamp(1, MAX_ORDER);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hilbert_order: 10,
            sort_on_prepare: true,
            profile_summary: false,
        }
    }
}
