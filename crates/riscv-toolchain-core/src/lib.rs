mod archive;
mod profile;

pub use archive::ArchiveType;
pub use profile::{ToolchainProfile, PROFILE_ENV_VAR, PROFILE_FILE_NAME};
