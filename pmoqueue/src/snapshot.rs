//! Snapshot binaire de la file d'attente
//!
//! Le snapshot est une séquence ordonnée de `Song` encodée avec bincode
//! (configuration `standard`), précédée d'un numéro de version.
//!
//! L'écriture passe par un fichier temporaire voisin puis un `rename`,
//! de sorte qu'un échec d'écriture ne corrompt jamais le snapshot précédent.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use bincode::{Decode, Encode};
use tracing::debug;

use crate::{QueueError, Result, Song};

/// Version courante du format de snapshot
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Encode, Decode)]
struct PlaylistSnapshot {
    version: u32,
    songs: Vec<Song>,
}

/// Encodes an ordered playlist.
pub fn encode_playlist(songs: Vec<Song>) -> Result<Vec<u8>> {
    let snapshot = PlaylistSnapshot {
        version: SNAPSHOT_VERSION,
        songs,
    };
    bincode::encode_to_vec(&snapshot, bincode::config::standard())
        .map_err(|e| QueueError::Encode(e.to_string()))
}

/// Decodes a playlist previously produced by [`encode_playlist`].
pub fn decode_playlist(bytes: &[u8]) -> Result<Vec<Song>> {
    let (snapshot, _read): (PlaylistSnapshot, usize) =
        bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| QueueError::Decode(e.to_string()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(QueueError::Decode(format!(
            "unsupported snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }

    Ok(snapshot.songs)
}

/// Writes `songs` to `path`, replacing any previous snapshot atomically.
pub async fn write_snapshot(path: &Path, songs: Vec<Song>) -> Result<()> {
    let count = songs.len();
    let bytes = encode_playlist(songs)?;
    let tmp = temporary_path(path);

    if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
        return Err(QueueError::io(&tmp, e));
    }

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        // Ne pas laisser traîner le fichier temporaire
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(QueueError::io(path, e));
    }

    debug!(path = %path.display(), songs = count, "playlist snapshot written");
    Ok(())
}

/// Reads and decodes the snapshot stored at `path`.
pub async fn read_snapshot(path: &Path) -> Result<Vec<Song>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| QueueError::io(path, e))?;
    decode_playlist(&bytes)
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("playlist"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_unknown_version() {
        let snapshot = PlaylistSnapshot {
            version: SNAPSHOT_VERSION + 1,
            songs: Vec::new(),
        };
        let bytes = bincode::encode_to_vec(&snapshot, bincode::config::standard()).unwrap();

        let err = decode_playlist(&bytes).unwrap_err();
        assert!(matches!(err, QueueError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_playlist(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_temporary_path_is_a_sibling() {
        let tmp = temporary_path(Path::new("/var/lib/jukebox/queue.snapshot"));
        assert_eq!(tmp, PathBuf::from("/var/lib/jukebox/queue.snapshot.tmp"));
    }
}
