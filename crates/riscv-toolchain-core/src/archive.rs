use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Tar,
    TarGz,
    TarXz,
    TarZst,
    Zip,
    SevenZip,
}

impl ArchiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
            Self::TarZst => "tar.zst",
            Self::Zip => "zip",
            Self::SevenZip => "7z",
        }
    }

    /// Only plain tarballs are extracted; compressed variants are rejected up front.
    pub fn is_supported(self) -> bool {
        self == Self::Tar
    }

    pub fn infer_from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz") {
            return Some(Self::TarGz);
        }
        if file_name.ends_with(".tar.xz") || file_name.ends_with(".txz") {
            return Some(Self::TarXz);
        }
        if file_name.ends_with(".tar.zst") || file_name.ends_with(".tzst") {
            return Some(Self::TarZst);
        }
        if file_name.ends_with(".tar") {
            return Some(Self::Tar);
        }
        if file_name.ends_with(".zip") {
            return Some(Self::Zip);
        }
        if file_name.ends_with(".7z") {
            return Some(Self::SevenZip);
        }
        None
    }
}
