use std::time::Duration;

/// When a file sink synchronizes its log file to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// fsync after every append
    Always,
    /// Only on an explicit `flush()`
    #[default]
    Manual,
    /// fsync on a recurring timer armed by `setup()`
    Periodic(Duration),
}
