mod compat;
mod environment;
mod fs_utils;
mod install_info;
mod layout;
mod lock;
mod pipeline;
mod process;
mod source;
mod stage;

pub use compat::ensure_target_binutils_compat;
pub use environment::{
    add_to_search_path, host_environment, register_install_environment, EnvironmentChanges,
    EnvironmentStore, MemoryEnvironment, SearchPathConvention, ShellProfileEnvironment,
    WindowsUserEnvironment,
};
pub use fs_utils::{remove_file_if_exists, replace_dir_with_copy};
pub use install_info::{read_install_info, write_install_info, InstallInfo};
pub use layout::{
    validate_installed, validate_toolchain_root, ToolchainLayout, INSTALL_INFO_FILE_NAME,
};
pub use lock::InstallLock;
pub use pipeline::{install_toolchain, InstallOutcome, InstallRequest};
pub use source::{default_install_root, installer_dir, resolve_source, resolve_target};
pub use stage::{advisory_cleanup, stage_source, StagedSource};
