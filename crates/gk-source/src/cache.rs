use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SourceError;

/// Cache disque des frames RGB24 brutes d'une session.
///
/// Un fichier par index (`frame_000042.rgb`), écrit une seule fois puis lu à
/// volonté ; sa présence vaut cache hit. L'écriture passe par un fichier
/// temporaire renommé, un lecteur ne voit donc jamais de frame partielle.
///
/// # Example
/// ```
/// use gk_source::cache::FrameCache;
/// let cache = FrameCache::new("/tmp/session", 12);
/// assert!(cache.frame_path(42).ends_with("frame_000042.rgb"));
/// ```
#[derive(Clone, Debug)]
pub struct FrameCache {
    dir: PathBuf,
    frame_len: usize,
}

impl FrameCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, frame_len: usize) -> Self {
        Self {
            dir: dir.into(),
            frame_len,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Taille attendue d'une frame en octets.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    #[must_use]
    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.rgb"))
    }

    pub async fn contains(&self, index: u32) -> bool {
        tokio::fs::try_exists(self.frame_path(index))
            .await
            .unwrap_or(false)
    }

    /// Lit la frame `index`, `None` si absente.
    ///
    /// Un fichier de taille inattendue est traité comme absent.
    ///
    /// # Errors
    /// I/O errors other than "not found".
    pub async fn read(&self, index: u32) -> Result<Option<Vec<u8>>, SourceError> {
        match tokio::fs::read(self.frame_path(index)).await {
            Ok(bytes) if bytes.len() == self.frame_len => Ok(Some(bytes)),
            Ok(bytes) => {
                log::warn!(
                    "cache: frame {index} ignorée ({} octets, attendu {})",
                    bytes.len(),
                    self.frame_len
                );
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Écrit la frame `index` si elle n'existe pas encore.
    ///
    /// Retourne `true` si le fichier vient d'être créé. Deux écritures
    /// concurrentes du même index produisent les mêmes octets.
    ///
    /// # Errors
    /// Returns [`SourceError::ShortRead`] on a size mismatch, or an I/O error.
    pub async fn write(&self, index: u32, data: &[u8]) -> Result<bool, SourceError> {
        if data.len() != self.frame_len {
            return Err(SourceError::ShortRead {
                expected: self.frame_len,
                actual: data.len(),
            });
        }
        if self.contains(index).await {
            return Ok(false);
        }

        let path = self.frame_path(index);
        let tmp = self
            .dir
            .join(format!("frame_{index:06}.{:08x}.part", rand::random::<u32>()));
        if let Err(e) = tokio::fs::write(&tmp, data).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, &path).await?;
        log::debug!("cache: frame {index} écrite");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_once_read_many() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FrameCache::new(dir.path(), 6);

        assert!(!cache.contains(3).await);
        assert_eq!(cache.read(3).await.unwrap(), None);

        assert!(cache.write(3, &[1, 2, 3, 4, 5, 6]).await.unwrap());
        assert!(!cache.write(3, &[9, 9, 9, 9, 9, 9]).await.unwrap());
        assert_eq!(cache.read(3).await.unwrap(), Some(vec![1, 2, 3, 4, 5, 6]));
        assert_eq!(cache.read(3).await.unwrap(), Some(vec![1, 2, 3, 4, 5, 6]));
    }

    #[tokio::test]
    async fn wrong_size_is_rejected_or_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FrameCache::new(dir.path(), 6);
        assert!(cache.write(0, &[1, 2, 3]).await.is_err());

        std::fs::write(cache.frame_path(1), [0u8; 4]).unwrap();
        assert_eq!(cache.read(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn no_temp_files_remain() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FrameCache::new(dir.path(), 3);
        for i in 0..5 {
            cache.write(i, &[i as u8; 3]).await.unwrap();
        }
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.iter().all(|n| n.ends_with(".rgb")));
    }
}
