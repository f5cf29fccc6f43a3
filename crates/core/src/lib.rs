pub mod arr;
pub mod config;
pub mod debrid;
pub mod downloads;
pub mod manager;
pub mod metrics;
pub mod recovery;
pub mod storage;
pub mod testing;

pub use arr::{ArrClient, ArrError, Consumer, HistoryRecord};
pub use config::{
    load_config, load_config_from_str, validate_config, ArrConfig, ArrKind, Config, ConfigError,
    PremiumizeConfig, SanitizedConfig,
};
pub use debrid::{DebridClient, DebridError, Item, ItemKind, PremiumizeClient, Transfer, TransferStatus};
pub use downloads::{
    Admission, DownloadProgress, DownloadRegistry, DownloadSlot, DownloadSnapshot, DownloadWorker,
    WorkerError,
};
pub use manager::{ManagerError, ManagerStatus, TickReport, TransferManager, TransferManagerConfig};
pub use recovery::{ErrorRecoveryMatcher, RecoveryOutcome};
pub use storage::{ArchiveStore, FsArchiveStore, StorageConfig, StorageError};
