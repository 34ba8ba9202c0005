//! Process-wide configuration options (specification §6).

/// Severity gate applied before a message reaches the `log` facade.
///
/// `Silent` and `Force` are meta-levels layered on top of the five `log`
/// crate severities: `Silent` suppresses everything this context would
/// otherwise emit, `Force` always emits regardless of the configured
/// level (used for messages the operator must never miss, such as the
/// fallback-to-shared-queue warning in §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Silent,
    Error,
    Warning,
    Info,
    Debug,
    Force,
}

impl LogLevel {
    pub fn allows(self, level: log::Level) -> bool {
        match self {
            LogLevel::Silent => false,
            LogLevel::Force => true,
            LogLevel::Error => level <= log::Level::Error,
            LogLevel::Warning => level <= log::Level::Warn,
            LogLevel::Info => level <= log::Level::Info,
            LogLevel::Debug => true,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Warning
    }
}

/// Where log output should additionally be mirrored, beyond whatever sink
/// the host process's `log` implementation already installed.
#[derive(Debug, Clone, Default)]
pub struct LogDestinations {
    pub console: bool,
    pub file: Option<std::path::PathBuf>,
}

/// Builder-constructed, process-wide configuration passed to
/// [`crate::manager::SharedContext::get_or_init`].
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub application_name: String,
    pub application_version: u32,
    pub instance_layers: Vec<String>,
    pub instance_extensions: Vec<String>,
    pub device_extensions: Vec<String>,
    pub preferred_adapter_id: Option<u32>,

    /// Default workgroup size for 1-D dispatches (default 256).
    pub default_workgroup_size_1d: u32,
    /// Default workgroup size x/y for 2-D dispatches.
    pub default_workgroup_size_2d: (u32, u32),
    /// Fence timeout in nanoseconds, per wait cycle (default 10,000ns);
    /// a wait is retried across cycles until signaled or an overall
    /// deadline elapses.
    pub fence_timeout_nanos: u64,
    /// Maximum in-flight descriptor-set concurrency (default 20).
    pub max_descriptor_sets: u32,

    pub log_level: LogLevel,
    pub log_destinations: LogDestinations,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            application_name: "ngrid".to_string(),
            application_version: 1,
            instance_layers: Vec::new(),
            instance_extensions: Vec::new(),
            device_extensions: Vec::new(),
            preferred_adapter_id: None,
            default_workgroup_size_1d: 256,
            default_workgroup_size_2d: (16, 16),
            fence_timeout_nanos: 10_000,
            max_descriptor_sets: 20,
            log_level: LogLevel::default(),
            log_destinations: LogDestinations {
                console: true,
                file: None,
            },
        }
    }
}

impl ContextConfig {
    pub fn builder() -> ContextConfigBuilder {
        ContextConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextConfigBuilder(ContextConfig);

impl ContextConfigBuilder {
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.0.application_name = name.into();
        self
    }

    pub fn application_version(mut self, version: u32) -> Self {
        self.0.application_version = version;
        self
    }

    pub fn preferred_adapter_id(mut self, id: u32) -> Self {
        self.0.preferred_adapter_id = Some(id);
        self
    }

    pub fn default_workgroup_size_1d(mut self, size: u32) -> Self {
        self.0.default_workgroup_size_1d = size;
        self
    }

    pub fn fence_timeout_nanos(mut self, nanos: u64) -> Self {
        self.0.fence_timeout_nanos = nanos;
        self
    }

    pub fn max_descriptor_sets(mut self, count: u32) -> Self {
        self.0.max_descriptor_sets = count;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.0.log_level = level;
        self
    }

    pub fn build(self) -> ContextConfig {
        self.0
    }
}
