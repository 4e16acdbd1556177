//! Sessions vidéo : upload, sonde, frames à la demande, batch, streaming,
//! préchargement et expiration.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use gk_core::config::VideoConfig;
use gk_core::frame::GlyphFrame;
use gk_core::settings::ConversionSettings;
use gk_effects::EffectRegistry;
use rayon::prelude::*;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::cancel::CancelToken;
use crate::decoder::{Ffmpeg, FrameDecoder, ProbeInfo};
use crate::error::SourceError;
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::session::{SessionInfo, VideoSession, effective_size};
use crate::stream::FrameStream;

/// Nom retenu quand le nom d'upload est vide après nettoyage.
pub const DEFAULT_UPLOAD_NAME: &str = "video.mp4";

/// Préfixe du fichier source : il ne peut pas prendre le nom d'une frame en cache.
pub const UPLOAD_PREFIX: &str = "source_";

/// Retire les caractères interdits dans un nom de fichier.
///
/// # Example
/// ```
/// use gk_source::service::sanitize_filename;
/// assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
/// assert_eq!(sanitize_filename("../a/b:c?.mov"), "..abc.mov");
/// assert_eq!(sanitize_filename("<>|"), "video.mp4");
/// assert_eq!(sanitize_filename(".."), "video.mp4");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.chars().all(|c| c == '.') {
        DEFAULT_UPLOAD_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Identifiant de session : 12 caractères hexadécimaux.
fn new_session_id() -> String {
    format!("{:012x}", rand::random::<u64>() & 0xFFFF_FFFF_FFFF)
}

/// Suppression best-effort d'un répertoire de session.
async fn remove_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => log::debug!("répertoire supprimé : {}", dir.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("suppression de {} impossible : {e}", dir.display()),
    }
}

/// Dépendances partagées entre le service et ses flux.
pub(crate) struct Engine<D> {
    decoder: Arc<D>,
    registry: Arc<EffectRegistry>,
    metrics: Arc<ServiceMetrics>,
}

impl<D> Clone for Engine<D> {
    fn clone(&self) -> Self {
        Self {
            decoder: Arc::clone(&self.decoder),
            registry: Arc::clone(&self.registry),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<D: FrameDecoder> Engine<D> {
    pub(crate) fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Conversion hors du runtime async ; rend le buffer brut pour réemploi.
    pub(crate) async fn convert(
        &self,
        session: &Arc<VideoSession>,
        data: Vec<u8>,
        index: u32,
        settings: &ConversionSettings,
    ) -> Result<(GlyphFrame, Vec<u8>), SourceError> {
        let session = Arc::clone(session);
        let registry = Arc::clone(&self.registry);
        let settings = settings.clone();
        let (frame, data) = tokio::task::spawn_blocking(move || {
            let frame = session.render(&registry, &data, index, &settings);
            (frame, data)
        })
        .await?;
        let frame = frame?;
        self.metrics.frames_processed(1);
        Ok((frame, data))
    }
}

/// Service vidéo : registre de sessions + pipeline décodeur/cache/effets.
///
/// Une session inconnue n'est pas une erreur : les accès renvoient `None`
/// (ou 0 pour le préchargement).
pub struct VideoService<D: FrameDecoder = Ffmpeg> {
    engine: Engine<D>,
    sessions: RwLock<HashMap<String, Arc<VideoSession>>>,
    config: VideoConfig,
}

impl<D: FrameDecoder> std::fmt::Debug for VideoService<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoService")
            .field("sessions", &self.read_sessions().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VideoService<Ffmpeg> {
    /// Service adossé à ffmpeg/ffprobe (binaires pris dans `config`).
    #[must_use]
    pub fn new(config: VideoConfig, registry: Arc<EffectRegistry>) -> Self {
        let decoder = Ffmpeg::new(config.ffmpeg.clone(), config.ffprobe.clone());
        Self::with_decoder(config, registry, decoder)
    }
}

impl<D: FrameDecoder> VideoService<D> {
    #[must_use]
    pub fn with_decoder(config: VideoConfig, registry: Arc<EffectRegistry>, decoder: D) -> Self {
        Self {
            engine: Engine {
                decoder: Arc::new(decoder),
                registry,
                metrics: Arc::new(ServiceMetrics::default()),
            },
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<EffectRegistry> {
        &self.engine.registry
    }

    #[must_use]
    pub fn decoder(&self) -> &D {
        self.engine.decoder()
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.engine.metrics.snapshot()
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<VideoSession>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<VideoSession>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persiste l'upload dans un répertoire de session, le sonde, puis
    /// enregistre la session.
    ///
    /// En cas d'échec le répertoire est supprimé et rien n'est enregistré.
    ///
    /// # Errors
    /// I/O errors while persisting the upload, or the prober's error.
    pub async fn create_session<R>(
        &self,
        upload: &mut R,
        filename: &str,
    ) -> Result<Arc<VideoSession>, SourceError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut id = new_session_id();
        while self.read_sessions().contains_key(&id) {
            id = new_session_id();
        }
        let dir = self.config.temp_root.join(&id);
        let source = dir.join(format!("{UPLOAD_PREFIX}{}", sanitize_filename(filename)));

        let probe = match self.ingest(upload, &dir, &source).await {
            Ok(probe) => probe,
            Err(e) => {
                log::warn!("session {id}: création échouée : {e}");
                remove_dir(&dir).await;
                return Err(e);
            }
        };

        let effective = effective_size(probe.width, probe.height, self.config.max_processing_width);
        let session = Arc::new(VideoSession::new(id.clone(), dir, source, probe, effective));
        session.touch();
        self.write_sessions().insert(id.clone(), Arc::clone(&session));
        self.engine.metrics.session_opened();
        log::info!(
            "session {id}: {}x{} → {}x{}, {:.3} fps, {} frames",
            probe.width,
            probe.height,
            effective.0,
            effective.1,
            probe.fps,
            session.total_frames()
        );
        Ok(session)
    }

    async fn ingest<R>(&self, upload: &mut R, dir: &Path, source: &Path) -> Result<ProbeInfo, SourceError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        tokio::fs::create_dir_all(dir).await?;
        let mut file = tokio::fs::File::create(source).await?;
        let bytes = tokio::io::copy(upload, &mut file).await?;
        file.flush().await?;
        drop(file);
        log::debug!("upload : {bytes} octets → {}", source.display());
        self.engine.decoder.probe(source).await
    }

    /// Session `id`, son horodatage d'accès est rafraîchi.
    #[must_use]
    pub fn session(&self, id: &str) -> Option<Arc<VideoSession>> {
        let session = self.read_sessions().get(id).cloned()?;
        session.touch();
        Some(session)
    }

    /// Métadonnées de toutes les sessions, triées par id.
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self.read_sessions().values().map(|s| s.info()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Frame `index` (ramené dans les bornes) convertie avec `settings`.
    ///
    /// Cache hit : lecture disque. Sinon extraction d'une seule frame, mise en
    /// cache. `Ok(None)` si la session est inconnue.
    ///
    /// # Errors
    /// Returns [`SourceError::Extract`] or [`SourceError::ShortRead`] if the
    /// frame is unavailable, or a spawn/I/O error.
    pub async fn get_frame(
        &self,
        id: &str,
        index: i64,
        settings: &ConversionSettings,
    ) -> Result<Option<GlyphFrame>, SourceError> {
        let Some(session) = self.session(id) else {
            return Ok(None);
        };
        let index = session.clamp_index(index);
        let data = match session.cache().read(index).await? {
            Some(data) => data,
            None => self.extract_single(&session, index).await?,
        };
        let (frame, _) = self.engine.convert(&session, data, index, settings).await?;
        Ok(Some(frame))
    }

    async fn extract_single(&self, session: &VideoSession, index: u32) -> Result<Vec<u8>, SourceError> {
        let mut pipe = self.engine.decoder.open(&session.extract_request(index, Some(1)))?;
        let mut buf = vec![0u8; session.cache().frame_len()];
        let read = pipe.read_frame(&mut buf).await;
        pipe.close().await;
        if !read? {
            return Err(SourceError::Extract(format!(
                "session {}: frame {index} indisponible",
                session.id()
            )));
        }
        if session.cache().write(index, &buf).await? {
            session.record_materialized();
        }
        Ok(buf)
    }

    /// Frames déjà en cache à partir de `start`, au plus `count`.
    ///
    /// S'arrête au premier trou, n'extrait jamais. La conversion est
    /// parallélisée avec rayon. `Ok(None)` si la session est inconnue.
    ///
    /// # Errors
    /// Cache I/O errors.
    pub async fn get_frame_batch(
        &self,
        id: &str,
        start: i64,
        count: u32,
        settings: &ConversionSettings,
    ) -> Result<Option<Vec<GlyphFrame>>, SourceError> {
        let Some(session) = self.session(id) else {
            return Ok(None);
        };
        let start = session.clamp_index(start);
        let end = start.saturating_add(count).min(session.total_frames());

        let mut raw = Vec::new();
        for index in start..end {
            match session.cache().read(index).await? {
                Some(data) => raw.push((index, data)),
                None => break,
            }
        }
        if raw.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let registry = Arc::clone(&self.engine.registry);
        let settings = settings.clone();
        let batch_session = Arc::clone(&session);
        let frames = tokio::task::spawn_blocking(move || {
            raw.into_par_iter()
                .map(|(index, data)| batch_session.render(&registry, &data, index, &settings))
                .collect::<Result<Vec<_>, _>>()
        })
        .await??;
        self.engine.metrics.frames_processed(frames.len() as u64);
        log::debug!("session {id}: batch de {} frames depuis {start}", frames.len());
        Ok(Some(frames))
    }

    /// Séquence live des frames de la session, annulable via `cancel`.
    ///
    /// Rejoue le cache puis décode le reste en une seule passe. `None` si la
    /// session est inconnue.
    #[must_use]
    pub fn stream_frames(
        &self,
        id: &str,
        settings: &ConversionSettings,
        cancel: CancelToken,
    ) -> Option<FrameStream> {
        let session = self.session(id)?;
        Some(FrameStream::spawn(
            self.engine.clone(),
            session,
            settings.clone(),
            cancel,
            self.config.stream_capacity,
        ))
    }

    /// Extrait toutes les frames vers le cache sans les convertir.
    ///
    /// `on_progress(extraites, total)` est appelé après chaque frame.
    /// Retourne le nombre de frames extraites, 0 si la session est inconnue.
    ///
    /// # Errors
    /// Spawn or cache I/O errors. A truncated last frame ends the pass.
    pub async fn preload_frames<F>(&self, id: &str, mut on_progress: F) -> Result<u32, SourceError>
    where
        F: FnMut(u32, u32),
    {
        let Some(session) = self.session(id) else {
            return Ok(0);
        };
        let total = session.total_frames();
        let mut pipe = self.engine.decoder.open(&session.extract_request(0, Some(total)))?;
        let mut buf = vec![0u8; session.cache().frame_len()];
        let mut extracted = 0u32;

        let result = loop {
            if extracted >= total {
                break Ok(());
            }
            match pipe.read_frame(&mut buf).await {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(SourceError::ShortRead { expected, actual }) => {
                    log::warn!("session {id}: préchargement tronqué ({actual}/{expected} octets)");
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
            match session.cache().write(extracted, &buf).await {
                Ok(true) => session.record_materialized(),
                Ok(false) => {}
                Err(e) => break Err(e),
            }
            session.touch();
            extracted += 1;
            on_progress(extracted, total);
        };
        pipe.close().await;
        result?;
        log::info!("session {id}: {extracted}/{total} frames préchargées");
        Ok(extracted)
    }

    /// Retire la session et supprime son répertoire. `false` si inconnue.
    pub async fn remove_session(&self, id: &str) -> bool {
        let Some(session) = self.write_sessions().remove(id) else {
            return false;
        };
        self.engine.metrics.sessions_closed(1);
        remove_dir(session.dir()).await;
        log::info!("session {id}: supprimée");
        true
    }

    /// Supprime toutes les sessions et leurs répertoires.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<VideoSession>> = self.write_sessions().drain().map(|(_, s)| s).collect();
        self.engine.metrics.sessions_closed(sessions.len() as u64);
        for session in &sessions {
            remove_dir(session.dir()).await;
        }
        log::info!("service vidéo arrêté, {} sessions supprimées", sessions.len());
    }

    /// Supprime les sessions inactives depuis plus de `idle_timeout`.
    ///
    /// Retourne le nombre de sessions supprimées.
    pub async fn sweep_idle(&self) -> usize {
        let timeout = self.config.idle_timeout();
        let mut expired = Vec::new();
        self.write_sessions().retain(|_, session| {
            if session.idle() >= timeout {
                expired.push(Arc::clone(session));
                false
            } else {
                true
            }
        });
        if expired.is_empty() {
            return 0;
        }
        self.engine.metrics.sessions_closed(expired.len() as u64);
        for session in &expired {
            remove_dir(session.dir()).await;
        }
        log::info!("balayage : {} sessions inactives supprimées", expired.len());
        expired.len()
    }

    /// Lance le balayage périodique ; s'arrête quand le service est libéré.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        let period = self.config.sweep_interval().max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // premier tick immédiat
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    break;
                };
                service.sweep_idle().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{self, FakeDecoder};

    fn service(decoder: FakeDecoder) -> (tempfile::TempDir, VideoService<FakeDecoder>) {
        let root = tempfile::tempdir().unwrap();
        let config = VideoConfig {
            temp_root: root.path().to_path_buf(),
            ..VideoConfig::default()
        };
        let service = VideoService::with_decoder(config, Arc::new(EffectRegistry::new()), decoder);
        (root, service)
    }

    fn settings() -> ConversionSettings {
        ConversionSettings {
            step: 2,
            ..Default::default()
        }
    }

    async fn upload(service: &VideoService<FakeDecoder>) -> Arc<VideoSession> {
        service
            .create_session(&mut &b"not really a video"[..], "clip.mp4")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_session_persists_upload() {
        let (_root, service) = service(FakeDecoder::new(5, 5));
        let session = upload(&service).await;

        assert_eq!(session.id().len(), 12);
        assert!(session.id().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(session.source().ends_with("source_clip.mp4"));
        assert_eq!(std::fs::read(session.source()).unwrap(), b"not really a video");
        assert_eq!(session.size(), (fake::WIDTH, fake::HEIGHT));
        assert_eq!(session.total_frames(), 5);

        assert!(service.session(session.id()).is_some());
        assert!(service.session("000000000000").is_none());
        assert_eq!(service.sessions().len(), 1);
        let metrics = service.metrics();
        assert_eq!((metrics.sessions_created, metrics.active_sessions), (1, 1));
    }

    #[tokio::test]
    async fn probe_failure_leaves_nothing_behind() {
        let (root, service) = service(FakeDecoder::failing_probe());
        let err = service
            .create_session(&mut &b"garbage"[..], "bad.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Probe(_)));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
        assert!(service.sessions().is_empty());
        assert_eq!(service.metrics().sessions_created, 0);
    }

    #[tokio::test]
    async fn hostile_upload_name_stays_inside_session_dir() {
        let (_root, service) = service(FakeDecoder::new(1, 1));
        let session = service
            .create_session(&mut &b"x"[..], "../../etc/passwd")
            .await
            .unwrap();
        assert_eq!(session.source().parent(), Some(session.dir()));
        let session = service.create_session(&mut &b"x"[..], "..").await.unwrap();
        assert!(session.source().ends_with(format!("{UPLOAD_PREFIX}{DEFAULT_UPLOAD_NAME}")));
    }

    #[tokio::test]
    async fn upload_named_like_a_frame_is_not_a_cache_hit() {
        let (_root, service) = service(FakeDecoder::new(3, 3));
        let upload = vec![7u8; fake::FRAME_LEN];
        let session = service
            .create_session(&mut upload.as_slice(), "frame_000000.rgb")
            .await
            .unwrap();
        assert_ne!(session.source(), session.cache().frame_path(0));
        assert!(!session.cache().contains(0).await);

        let frames = service.get_frame_batch(session.id(), 0, 3, &settings()).await.unwrap().unwrap();
        assert!(frames.is_empty());
        service.get_frame(session.id(), 0, &settings()).await.unwrap().unwrap();
        assert_eq!(service.decoder().opens(), 1);
        assert_eq!(std::fs::read(session.source()).unwrap(), upload);
    }

    #[tokio::test]
    async fn get_frame_clamps_and_caches() {
        let (_root, service) = service(FakeDecoder::new(5, 5));
        let id = upload(&service).await.id().to_string();

        let last = service.get_frame(&id, 99, &settings()).await.unwrap().unwrap();
        assert_eq!((last.frame_index, last.total_frames), (4, 5));
        assert_eq!(service.decoder().opens(), 1);
        let request = service.decoder().last_request().unwrap();
        assert_eq!(request.frame_limit, Some(1));
        assert_eq!(request.seek_secs, Some(0.4));

        let again = service.get_frame(&id, 4, &settings()).await.unwrap().unwrap();
        assert_eq!(again, last);
        assert_eq!(service.decoder().opens(), 1, "second read must hit the cache");

        let first = service.get_frame(&id, -3, &settings()).await.unwrap().unwrap();
        assert_eq!(first.frame_index, 0);
        assert_ne!(first.text, last.text);
        assert_eq!(service.session(&id).unwrap().materialized(), 2);
        assert_eq!(service.metrics().frames_processed, 3);
    }

    #[tokio::test]
    async fn unknown_session_is_none_not_error() {
        let (_root, service) = service(FakeDecoder::new(5, 5));
        assert!(service.get_frame("nope", 0, &settings()).await.unwrap().is_none());
        assert!(service.get_frame_batch("nope", 0, 3, &settings()).await.unwrap().is_none());
        assert!(service.stream_frames("nope", &settings(), CancelToken::new()).is_none());
        assert_eq!(service.preload_frames("nope", |_, _| {}).await.unwrap(), 0);
        assert!(!service.remove_session("nope").await);
    }

    #[tokio::test]
    async fn missing_frame_is_unavailable_and_session_survives() {
        let (_root, service) = service(FakeDecoder::new(5, 3));
        let id = upload(&service).await.id().to_string();

        let err = service.get_frame(&id, 4, &settings()).await.unwrap_err();
        assert!(matches!(err, SourceError::Extract(_)));
        let ok = service.get_frame(&id, 1, &settings()).await.unwrap().unwrap();
        assert_eq!(ok.frame_index, 1);
    }

    #[tokio::test]
    async fn batch_reads_cache_only_and_stops_at_first_miss() {
        let (_root, service) = service(FakeDecoder::new(5, 5));
        let id = upload(&service).await.id().to_string();
        for i in [0, 1, 3] {
            service.get_frame(&id, i, &settings()).await.unwrap();
        }
        let opens = service.decoder().opens();

        let batch = service.get_frame_batch(&id, 0, 10, &settings()).await.unwrap().unwrap();
        let indices: Vec<u32> = batch.iter().map(|f| f.frame_index).collect();
        assert_eq!(indices, [0, 1]);

        let batch = service.get_frame_batch(&id, 3, 5, &settings()).await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0], service.get_frame(&id, 3, &settings()).await.unwrap().unwrap());

        assert!(service.get_frame_batch(&id, 2, 3, &settings()).await.unwrap().unwrap().is_empty());
        assert_eq!(service.decoder().opens(), opens);
    }

    #[tokio::test]
    async fn preload_fills_cache_and_reports_progress() {
        let (_root, service) = service(FakeDecoder::new(5, 5));
        let session = upload(&service).await;

        let mut progress = Vec::new();
        let extracted = service
            .preload_frames(session.id(), |done, total| progress.push((done, total)))
            .await
            .unwrap();
        assert_eq!(extracted, 5);
        assert_eq!(progress, [(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
        assert_eq!(session.materialized(), 5);
        assert_eq!(service.decoder().last_request().unwrap().seek_secs, None);

        let batch = service.get_frame_batch(session.id(), 0, 5, &settings()).await.unwrap().unwrap();
        assert_eq!(batch.len(), 5);
    }

    #[tokio::test]
    async fn preload_stops_when_decoder_runs_dry() {
        let (_root, service) = service(FakeDecoder::new(5, 3));
        let session = upload(&service).await;
        assert_eq!(service.preload_frames(session.id(), |_, _| {}).await.unwrap(), 3);
        assert!(session.cache().contains(2).await);
        assert!(!session.cache().contains(3).await);
    }

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let (root, busy) = service(FakeDecoder::new(1, 1));
        upload(&busy).await;
        assert_eq!(busy.sweep_idle().await, 0);
        assert_eq!(busy.sessions().len(), 1);

        let config = VideoConfig {
            temp_root: root.path().to_path_buf(),
            idle_timeout_secs: 0,
            ..VideoConfig::default()
        };
        let service =
            VideoService::with_decoder(config, Arc::new(EffectRegistry::new()), FakeDecoder::new(1, 1));
        let session = upload(&service).await;
        let dir = session.dir().to_path_buf();
        drop(session);

        assert_eq!(service.sweep_idle().await, 1);
        assert!(!dir.exists());
        assert!(service.sessions().is_empty());
        assert_eq!(service.metrics().active_sessions, 0);
    }

    #[tokio::test]
    async fn remove_and_shutdown_delete_directories() {
        let (_root, service) = service(FakeDecoder::new(1, 1));
        let a = upload(&service).await;
        let b = upload(&service).await;
        assert_ne!(a.id(), b.id());

        assert!(service.remove_session(a.id()).await);
        assert!(!a.dir().exists());
        assert!(b.dir().exists());

        service.shutdown().await;
        assert!(!b.dir().exists());
        assert!(service.sessions().is_empty());
        assert_eq!(service.metrics().active_sessions, 0);
    }

    #[tokio::test]
    async fn sweeper_stops_with_the_service() {
        let root = tempfile::tempdir().unwrap();
        let config = VideoConfig {
            temp_root: root.path().to_path_buf(),
            sweep_interval_secs: 1,
            ..VideoConfig::default()
        };
        let service = Arc::new(VideoService::with_decoder(
            config,
            Arc::new(EffectRegistry::new()),
            FakeDecoder::new(1, 1),
        ));
        let handle = service.spawn_sweeper();
        drop(service);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn ffmpeg_end_to_end() {
        let ffmpeg = Ffmpeg::default();
        if !ffmpeg.is_available().await {
            return;
        }
        let root = tempfile::tempdir().unwrap();
        let clip = root.path().join("testsrc.mp4");
        let status = tokio::process::Command::new("ffmpeg")
            .args(["-v", "quiet", "-y", "-f", "lavfi", "-i", "testsrc=size=96x64:rate=10", "-t", "1"])
            .args(["-pix_fmt", "yuv420p"])
            .arg(&clip)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let config = VideoConfig {
            temp_root: root.path().join("sessions"),
            max_processing_width: 48,
            ..VideoConfig::default()
        };
        let service = VideoService::new(config, Arc::new(EffectRegistry::new()));
        let mut file = tokio::fs::File::open(&clip).await.unwrap();
        let session = service.create_session(&mut file, "testsrc.mp4").await.unwrap();
        assert_eq!(session.size(), (48, 32));
        assert!(session.total_frames() >= 9);

        let frame = service.get_frame(session.id(), 5, &settings()).await.unwrap().unwrap();
        assert_eq!((frame.columns, frame.rows), (24, 16));

        let mut stream = service
            .stream_frames(session.id(), &settings(), CancelToken::new())
            .unwrap();
        let mut expected = 0;
        while let Some(frame) = stream.next().await {
            assert_eq!(frame.unwrap().frame_index, expected);
            expected += 1;
        }
        assert!(expected >= 9);
        service.shutdown().await;
    }
}
