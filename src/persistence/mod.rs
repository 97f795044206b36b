pub mod backup;
pub mod files;
pub mod store;

pub use backup::BackupManager;
pub use files::{
    append_line, atomic_write, backups_dir, data_dir, ensure_vault_dirs, get_vault_dir,
    init_local_vault, read_file, reports_dir,
};
pub use store::Store;
