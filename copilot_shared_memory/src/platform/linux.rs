//! Linux-specific shared memory operations

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use nix::unistd::getpid;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Mapping options for newly created segments
#[derive(Debug, Clone, Copy)]
pub struct MapConfig {
    /// Pre-fault pages at creation (MAP_POPULATE)
    pub populate: bool,
    /// File mode of the backing file
    pub mode: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            populate: true,
            mode: 0o660,
        }
    }
}

fn map_open_error(name: &str, err: std::io::Error) -> ShmError {
    match err.kind() {
        ErrorKind::NotFound => ShmError::NotFound {
            name: name.to_string(),
        },
        ErrorKind::AlreadyExists => ShmError::AlreadyExists {
            name: name.to_string(),
        },
        ErrorKind::PermissionDenied => ShmError::PermissionDenied {
            name: name.to_string(),
        },
        _ => ShmError::Io { source: err },
    }
}

/// Create a fresh backing file and map it
///
/// Fails with `AlreadyExists` if the file is present.
pub fn create_segment_mmap(
    name: &str,
    path: &Path,
    size: usize,
    config: &MapConfig,
) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .create_new(true)
        .read(true)
        .write(true)
        .mode(config.mode)
        .open(path)
        .map_err(|e| map_open_error(name, e))?;

    file.set_len(size as u64)?;

    let mut options = MmapOptions::new();
    if config.populate {
        options.populate();
    }

    // SAFETY: the file was just created by us with the requested length.
    let mmap = unsafe { options.map_mut(&file)? };
    Ok(mmap)
}

/// Attach to an existing segment file
pub fn attach_segment_mmap(name: &str, path: &Path) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| map_open_error(name, e))?;

    // SAFETY: concurrent modification is coordinated through the header's
    // version counter.
    let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
    Ok(mmap)
}

/// Check if process is alive using kill(pid, 0)
///
/// Pid 0 and values outside the positive `pid_t` range would address a
/// process group, so they are never alive.
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw == 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(_) => true,
        Err(nix::Error::ESRCH) => false,
        // Process exists but belongs to someone else
        Err(nix::Error::EPERM) => true,
        Err(_) => false,
    }
}

/// Get current process ID
pub fn get_current_pid() -> u32 {
    getpid().as_raw() as u32
}
