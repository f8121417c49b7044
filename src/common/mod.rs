//! Shared utilities across ubicheck modules.

pub mod files;
pub mod hash;
pub mod lookup;
pub mod temp;

pub use files::write_file_with_dirs;
pub use hash::sha256_file;
pub use lookup::{exists_in_root, is_executable, resolve_in_root};
pub use temp::{prepare_work_dir, run_stamp};
