//! `/proc/<pid>/mem` backend.
//!
//! The game runs under Wine, so on Linux its address space is reachable
//! through the process memory pseudo-file with positioned reads and writes.

use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use tracing::{debug, info};

use super::{MemoryError, ProcessMemory, GAME_PROCESS_NAMES};

/// Scan `proc_root` (normally `/proc`) for the game process.
///
/// A process named `popcapgame1.exe` wins over one named
/// `PlantsVsZombies`; among equals the first one listed is kept.
pub fn find_game_pid(proc_root: &Path) -> Result<u32, MemoryError> {
    let entries = fs::read_dir(proc_root).map_err(|e| MemoryError::GameNotFound {
        reason: format!("cannot list {}: {}", proc_root.display(), e),
    })?;

    let mut best: Option<(usize, u32)> = None;

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(pid) = file_name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };

        // Processes can exit between listing and reading; skip them.
        let Ok(comm) = fs::read(entry.path().join("comm")) else {
            continue;
        };
        let name = String::from_utf8_lossy(&comm);
        let name = name.trim_end_matches('\n');

        if let Some(rank) = GAME_PROCESS_NAMES.iter().position(|n| *n == name) {
            debug!(pid, name, "candidate game process");
            if best.map_or(true, |(best_rank, _)| rank < best_rank) {
                best = Some((rank, pid));
            }
        }
    }

    best.map(|(_, pid)| pid).ok_or_else(|| MemoryError::GameNotFound {
        reason: format!("no process named {}", GAME_PROCESS_NAMES.join(" or ")),
    })
}

/// Read-write handle on another process's memory, kept open for the
/// lifetime of the value.
#[derive(Debug)]
pub struct ProcMemory {
    pid: u32,
    file: File,
}

impl ProcMemory {
    pub fn attach(pid: u32) -> Result<Self, MemoryError> {
        let path = format!("/proc/{}/mem", pid);
        Self::open(pid, Path::new(&path))
    }

    /// Locate the game under `/proc` and attach to it.
    pub fn attach_game() -> Result<Self, MemoryError> {
        let pid = find_game_pid(Path::new("/proc"))?;
        Self::attach(pid)
    }

    /// Open an arbitrary memory file. Offsets in the file are addresses.
    pub fn open(pid: u32, path: &Path) -> Result<Self, MemoryError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| MemoryError::Open {
                path: path.display().to_string(),
                source,
            })?;
        info!(pid, path = %path.display(), "attached to process memory");
        Ok(Self { pid, file })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl ProcessMemory for ProcMemory {
    fn read_bytes(&self, address: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        let size = buf.len();
        match self.file.read_at(buf, u64::from(address)) {
            Ok(n) if n == size => Ok(()),
            Ok(n) => Err(MemoryError::Read {
                address,
                size,
                reason: format!("short read of {} bytes", n),
            }),
            Err(e) => Err(MemoryError::Read {
                address,
                size,
                reason: e.to_string(),
            }),
        }
    }

    fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<(), MemoryError> {
        let size = data.len();
        match self.file.write_at(data, u64::from(address)) {
            Ok(n) if n == size => Ok(()),
            Ok(n) => Err(MemoryError::Write {
                address,
                size,
                reason: format!("short write of {} bytes", n),
            }),
            Err(e) => Err(MemoryError::Write {
                address,
                size,
                reason: e.to_string(),
            }),
        }
    }
}
