use std::sync::OnceLock;

static SETTINGS: OnceLock<CollectionSettings> = OnceLock::new();

// every field is optional, unset fields fall back to the defaults below
#[derive(Debug, Default, Clone)]
pub struct CollectionCreateInfo {
    pub max_array_size: Option<usize>,
    // below this size storage doubles on growth, above it grows by half
    pub expansion_double_limit: Option<usize>,
    pub sort_insertion_threshold: Option<usize>,
    pub default_buffer_size: Option<usize>,
    pub max_buffer_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSettings {
    pub max_array_size: usize,
    pub expansion_double_limit: usize,
    pub sort_insertion_threshold: usize,
    pub default_buffer_size: usize,
    pub max_buffer_size: usize,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            max_array_size: 100_000_000,
            expansion_double_limit: 2_000,
            sort_insertion_threshold: 10,
            default_buffer_size: 256,
            max_buffer_size: isize::MAX as usize,
        }
    }
}

impl From<CollectionCreateInfo> for CollectionSettings {
    fn from(info: CollectionCreateInfo) -> Self {
        let mut settings = CollectionSettings::default();
        info.max_array_size
            .inspect(|&val| settings.max_array_size = val);
        info.expansion_double_limit
            .inspect(|&val| settings.expansion_double_limit = val);
        info.sort_insertion_threshold
            .inspect(|&val| settings.sort_insertion_threshold = val.max(2));
        info.default_buffer_size
            .inspect(|&val| settings.default_buffer_size = val.max(1));
        info.max_buffer_size
            .inspect(|&val| settings.max_buffer_size = val);
        settings
    }
}

/// Install process-wide settings. Returns `false` if settings were
/// already installed (or already read), in which case nothing changes.
pub fn install(info: CollectionCreateInfo) -> bool {
    SETTINGS.set(CollectionSettings::from(info)).is_ok()
}

pub fn get() -> &'static CollectionSettings {
    SETTINGS.get_or_init(CollectionSettings::default)
}
