use crate::error::instance::InstanceError;
use crate::protocol::read_message_line;
use crate::transport::RendezvousListener;

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::debug;
use tokio::net::{UnixListener, UnixStream};
use tokio::task::spawn_blocking;

pub struct UnixSocketListener {
    listener: UnixListener,
    artifact: SocketArtifact,
}

impl UnixSocketListener {
    /// Bind and listen at `path`. Fails if the file already exists.
    pub fn bind(path: &Path) -> IoResult<Self> {
        let listener = UnixListener::bind(path)?;
        let inode = socket_inode(path).ok_or_else(|| {
            IoError::new(
                ErrorKind::NotFound,
                format!("{} vanished right after bind", path.display()),
            )
        })?;

        Ok(Self {
            listener,
            artifact: SocketArtifact {
                path: path.to_path_buf(),
                inode,
            },
        })
    }

    /// The socket file this listener created.
    pub fn artifact(&self) -> &SocketArtifact {
        &self.artifact
    }
}

impl RendezvousListener for UnixSocketListener {
    async fn accept_line(&mut self) -> Result<Option<String>, InstanceError> {
        let (stream, _addr) = self.listener.accept().await?;
        read_message_line(stream).await
    }
}

/// Socket file created by this process, identified by path and inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketArtifact {
    path: PathBuf,
    inode: u64,
}

impl SocketArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file at the path is still the one this process bound.
    pub fn is_current(&self) -> bool {
        socket_inode(&self.path) == Some(self.inode)
    }

    /// Best-effort unlink. A file that was replaced by another launch is left alone.
    pub fn remove(&self) {
        if !self.is_current() {
            debug!(
                "{} no longer belongs to this instance, leaving it",
                self.path.display()
            );
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) => debug!("Could not remove {}: {e}", self.path.display()),
        }
    }
}

/// Exclusive advisory lock on `<socket>.lock`, held while a launch decides
/// whether it owns the socket path. Released on drop.
pub struct ClaimLock {
    file: File,
}

impl ClaimLock {
    /// Block (off the async workers) until the lock for `socket` is ours.
    pub async fn acquire(socket: &Path) -> Result<Self, InstanceError> {
        let lock_path = lock_path(socket);
        let file = spawn_blocking(move || -> IoResult<File> {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await??;

        Ok(Self { file })
    }
}

impl Drop for ClaimLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// `<socket>.lock`, next to the socket file.
pub fn lock_path(socket: &Path) -> PathBuf {
    let mut name = OsString::from(socket.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

pub async fn connect(path: &Path) -> IoResult<UnixStream> {
    UnixStream::connect(path).await
}

/// Inode of the socket file, used to make sure a file is still the one that
/// was probed or bound before deleting it.
pub fn socket_inode(path: &Path) -> Option<u64> {
    std::fs::symlink_metadata(path).ok().map(|m| m.ino())
}
