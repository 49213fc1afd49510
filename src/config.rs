//! Runtime-tunable knobs a concrete store plugs into the page core:
//! compression tier selection and the assertion toggle.

/// `0` disables compression; `1` selects the fast tier; `2` or higher
/// selects the high-ratio tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub compression_level: u8,
    /// When set, `Page::assert_consistent` is expected to be called
    /// after mutation.
    pub assertions_enabled: bool,
    /// Smallest page-size class a store is willing to allocate fresh
    /// pages into; purely advisory to callers building `Page`s, the
    /// core itself never enforces a minimum.
    pub min_page_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression_level: 1,
            assertions_enabled: false,
            min_page_size: 32,
        }
    }
}
