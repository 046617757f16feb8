//! Filesystem ticket store: one file per ticket.
//!
//! Each ticket lives in `<directory>/<ticket id>` as a versioned JSON record.
//! Writes go to a hidden temporary file first and are renamed into place, so a
//! reader never sees a partially written record. Consumption relies on the
//! atomicity of `unlink`: of several concurrent deletes of the same file, only
//! one succeeds.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, instrument};

use casserver_core::{Ticket, TicketId, TicketStore, TicketStoreError};

use super::record;

/// Monotonic counter used to name temporary files.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FileSystemTicketStore {
    directory: PathBuf,
}

impl FileSystemTicketStore {
    /// Open a store rooted at `directory`.
    ///
    /// Fails with [`TicketStoreError::Configuration`] if the directory does not
    /// exist or is not writable.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, TicketStoreError> {
        let directory = directory.into();

        if !directory.is_dir() {
            return Err(TicketStoreError::configuration(format!(
                "Directory for CAS Server ticket storage [{}] does not exist.",
                directory.display()
            )));
        }

        probe_writable(&directory).map_err(|e| {
            TicketStoreError::configuration(format!(
                "Directory for CAS Server ticket storage [{}] is not writable: {e}",
                directory.display()
            ))
        })?;

        debug!(directory = %directory.display(), "file system ticket store ready");
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the record for `id`, or `None` when the id is not a plain file name.
    fn path_for(&self, id: &TicketId) -> Option<PathBuf> {
        let name = id.as_str();
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0']);
        plain.then(|| self.directory.join(name))
    }

    fn temp_path(&self, id: &TicketId) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.directory
            .join(format!(".{}.{}.{n}.tmp", id.as_str(), std::process::id()))
    }
}

fn probe_writable(directory: &Path) -> std::io::Result<()> {
    let probe = directory.join(format!(".write-probe.{}", std::process::id()));
    OpenOptions::new().write(true).create(true).truncate(true).open(&probe)?;
    fs::remove_file(&probe)
}

impl TicketStore for FileSystemTicketStore {
    #[instrument(skip(self), fields(directory = %self.directory.display()))]
    fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, TicketStoreError> {
        let Some(path) = self.path_for(id) else {
            debug!("ticket id is not a valid record name");
            return Ok(None);
        };

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(TicketStoreError::corrupt(id.as_str(), e.to_string()));
            }
            Err(e) => {
                return Err(TicketStoreError::backend(format!(
                    "reading {}: {e}",
                    path.display()
                )));
            }
        };

        record::decode(id, &raw).map(Some)
    }

    fn add_ticket(&self, ticket: &Ticket) -> Result<(), TicketStoreError> {
        let path = self.path_for(&ticket.id).ok_or_else(|| {
            TicketStoreError::backend(format!("ticket id '{}' is not a valid record name", ticket.id))
        })?;
        let payload = record::encode(ticket)?;

        let temp = self.temp_path(&ticket.id);
        let write = || -> std::io::Result<()> {
            let mut file = OpenOptions::new().write(true).create_new(true).open(&temp)?;
            file.write_all(payload.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&temp);
            TicketStoreError::backend(format!("writing {}: {e}", path.display()))
        })
    }

    fn delete_ticket(&self, id: &TicketId) -> Result<bool, TicketStoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(false);
        };

        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TicketStoreError::backend(format!(
                "removing {}: {e}",
                path.display()
            ))),
        }
    }
}
