//! Streaming vidéo : une tâche productrice par flux, canal borné vers le
//! consommateur.
//!
//! ```text
//! cache (replay) ──┐
//!                  ├─► convert (spawn_blocking) ─► flume::bounded ─► FrameStream::next
//! ffmpeg (pipe) ───┘        └─► cache.write (nouvelles frames)
//! ```
//!
//! L'annulation coupe la lecture du pipe et l'envoi : le processus est tué
//! puis attendu avant la fin de la tâche. Les frames déjà écrites restent en
//! cache.

use std::sync::Arc;

use gk_core::frame::GlyphFrame;
use gk_core::settings::ConversionSettings;
use tokio::task::JoinHandle;

use crate::cancel::CancelToken;
use crate::decoder::{FrameDecoder, RawPipe};
use crate::error::SourceError;
use crate::service::Engine;
use crate::session::VideoSession;

type Item = Result<GlyphFrame, SourceError>;

/// Séquence de frames converties, livrées par index croissant, une seule fois.
///
/// Annuler (via [`FrameStream::cancel`], le [`CancelToken`] ou en
/// abandonnant le flux) arrête la production sans erreur visible.
#[derive(Debug)]
pub struct FrameStream {
    rx: flume::Receiver<Item>,
    session: Arc<VideoSession>,
    cancel: CancelToken,
    task: Option<JoinHandle<()>>,
}

impl FrameStream {
    pub(crate) fn spawn<D: FrameDecoder>(
        engine: Engine<D>,
        session: Arc<VideoSession>,
        settings: ConversionSettings,
        cancel: CancelToken,
        capacity: usize,
    ) -> Self {
        let (tx, rx) = flume::bounded(capacity.max(1));
        let producer = Producer {
            engine,
            session: Arc::clone(&session),
            settings,
            tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(producer.run());
        Self {
            rx,
            session,
            cancel,
            task: Some(task),
        }
    }

    /// Frame suivante, `None` en fin de séquence ou après annulation.
    ///
    /// Chaque frame reçue compte comme un accès à la session.
    pub async fn next(&mut self) -> Option<Item> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let item = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            item = self.rx.recv_async() => item.ok(),
        };
        if item.is_some() {
            self.session.touch();
        }
        item
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Annule et attend la fin du producteur (processus décodeur inclus).
    pub async fn cancel(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("stream: producteur interrompu : {e}");
            }
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            if !task.is_finished() {
                self.cancel.cancel();
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct Producer<D: FrameDecoder> {
    engine: Engine<D>,
    session: Arc<VideoSession>,
    settings: ConversionSettings,
    tx: flume::Sender<Item>,
    cancel: CancelToken,
}

impl<D: FrameDecoder> Producer<D> {
    async fn run(self) {
        let id = self.session.id().to_string();
        log::info!(
            "stream {id}: démarrage ({} frames, effet {})",
            self.session.total_frames(),
            self.settings.effect
        );
        let mut delivered = 0u32;
        match self.produce(&mut delivered).await {
            Ok(()) if self.cancel.is_cancelled() => {
                log::info!("stream {id}: annulé après {delivered} frames");
            }
            Ok(()) => log::info!("stream {id}: terminé, {delivered} frames"),
            Err(e) => {
                log::warn!("stream {id}: interrompu après {delivered} frames : {e}");
                if !self.cancel.is_cancelled() {
                    let _ = self.tx.send_async(Err(e)).await;
                }
            }
        }
    }

    async fn produce(&self, delivered: &mut u32) -> Result<(), SourceError> {
        let total = self.session.total_frames();
        let mut index = 0u32;

        // Replay du cache jusqu'au premier trou
        while index < total {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            let Some(data) = self.session.cache().read(index).await? else {
                break;
            };
            self.session.touch();
            let (frame, _) = self
                .engine
                .convert(&self.session, data, index, &self.settings)
                .await?;
            if self.deliver(frame).await == Flow::Stop {
                return Ok(());
            }
            *delivered += 1;
            index += 1;
        }
        if index >= total || self.cancel.is_cancelled() {
            return Ok(());
        }

        log::debug!(
            "stream {}: cache épuisé à la frame {index}, décodage",
            self.session.id()
        );
        let request = self.session.extract_request(index, Some(total - index));
        let mut pipe = self.engine.decoder().open(&request)?;
        let result = self.decode(&mut pipe, index, total, delivered).await;
        pipe.close().await;
        result
    }

    async fn decode(
        &self,
        pipe: &mut RawPipe,
        mut index: u32,
        total: u32,
        delivered: &mut u32,
    ) -> Result<(), SourceError> {
        let mut buf = vec![0u8; self.session.cache().frame_len()];
        while index < total {
            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(()),
                read = pipe.read_frame(&mut buf) => read,
            };
            match read {
                Ok(true) => {}
                Ok(false) => break,
                Err(SourceError::ShortRead { expected, actual }) => {
                    log::warn!(
                        "stream {}: dernière frame tronquée ({actual}/{expected} octets)",
                        self.session.id()
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
            self.session.touch();

            match self.session.cache().write(index, &buf).await {
                Ok(true) => self.session.record_materialized(),
                Ok(false) => {}
                Err(e) => log::warn!("stream {}: frame {index} non cachée : {e}", self.session.id()),
            }

            let (frame, returned) = self
                .engine
                .convert(&self.session, buf, index, &self.settings)
                .await?;
            buf = returned;
            if self.deliver(frame).await == Flow::Stop {
                return Ok(());
            }
            *delivered += 1;
            index += 1;
        }
        Ok(())
    }

    async fn deliver(&self, frame: GlyphFrame) -> Flow {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Flow::Stop,
            sent = self.tx.send_async(Ok(frame)) => {
                if sent.is_ok() { Flow::Continue } else { Flow::Stop }
            }
        }
    }
}
