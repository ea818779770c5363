use std::fs::File;
use std::io::Read;

use bzip2::read::MultiBzDecoder;
use camino::{Utf8Path, Utf8PathBuf};
use tar::Archive;

use crate::error::MinerError;

#[derive(Debug, Clone)]
pub struct ArchiveMember {
    pub name: String,
    pub contents: Vec<u8>,
}

/// A job's `.tar.bz2` result bundle, decompressed into memory.
///
/// Opening walks the whole archive, so anything that is not a well-formed
/// bzip2 tar stream (an error page saved under the archive name, a truncated
/// body) fails here rather than later. Concatenated bzip2 streams, as
/// written by parallel compressors, are read through to the end.
#[derive(Debug, Clone)]
pub struct ResultArchive {
    path: Utf8PathBuf,
    members: Vec<ArchiveMember>,
}

impl ResultArchive {
    pub fn open(path: &Utf8Path) -> Result<Self, MinerError> {
        let archive_err = |message: String| MinerError::Archive {
            path: path.to_string(),
            message,
        };

        let file = File::open(path.as_std_path()).map_err(|err| archive_err(err.to_string()))?;
        let size = file
            .metadata()
            .map_err(|err| archive_err(err.to_string()))?
            .len();
        if size == 0 {
            return Err(archive_err("empty file".to_string()));
        }

        let mut archive = Archive::new(MultiBzDecoder::new(file));
        let entries = archive
            .entries()
            .map_err(|err| archive_err(err.to_string()))?;
        let mut members = Vec::new();
        for entry in entries {
            let mut entry = entry.map_err(|err| archive_err(err.to_string()))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry
                .path()
                .map_err(|err| archive_err(err.to_string()))?
                .to_string_lossy()
                .into_owned();
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .map_err(|err| archive_err(err.to_string()))?;
            members.push(ArchiveMember { name, contents });
        }

        Ok(Self {
            path: path.to_owned(),
            members,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .map(|member| member.name.trim_start_matches("./"))
    }

    /// Contents of the member stored exactly under `name` (a leading `./` in
    /// the stored path is ignored).
    pub fn member(&self, name: &str) -> Result<&[u8], MinerError> {
        self.members
            .iter()
            .find(|member| member.name.trim_start_matches("./") == name)
            .map(|member| member.contents.as_slice())
            .ok_or_else(|| MinerError::MissingMember(format!("{name} in {}", self.path)))
    }
}
