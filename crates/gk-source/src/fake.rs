//! Décodeur en mémoire pour les tests du pipeline vidéo.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::DuplexStream;

use crate::decoder::{ExtractRequest, FrameDecoder, ProbeInfo, RawPipe};
use crate::error::SourceError;

pub(crate) const WIDTH: u32 = 4;
pub(crate) const HEIGHT: u32 = 2;
pub(crate) const FRAME_LEN: usize = (WIDTH * HEIGHT * 3) as usize;
pub(crate) const FPS: f64 = 10.0;

/// Frame `i` : gris uniforme `i * 50`.
pub(crate) fn gray_frame(i: u32) -> Vec<u8> {
    vec![(i * 50) as u8; FRAME_LEN]
}

pub(crate) fn probe_info(total_frames: u32) -> ProbeInfo {
    ProbeInfo {
        width: WIDTH,
        height: HEIGHT,
        fps: FPS,
        duration: f64::from(total_frames) / FPS,
        total_frames,
    }
}

pub(crate) struct FakeDecoder {
    probe: Option<ProbeInfo>,
    frames: Vec<Vec<u8>>,
    stalling: bool,
    opens: AtomicUsize,
    requests: Mutex<Vec<ExtractRequest>>,
    writer: Mutex<Option<DuplexStream>>,
}

impl FakeDecoder {
    /// `available` frames réelles pour une sonde annonçant `total_frames`.
    pub(crate) fn new(total_frames: u32, available: u32) -> Self {
        Self {
            probe: Some(probe_info(total_frames)),
            frames: (0..available).map(gray_frame).collect(),
            stalling: false,
            opens: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            writer: Mutex::new(None),
        }
    }

    pub(crate) fn failing_probe() -> Self {
        Self {
            probe: None,
            ..Self::new(1, 0)
        }
    }

    /// Le pipe ne produit que ce que le test écrit via [`FakeDecoder::take_writer`].
    pub(crate) fn stalling(total_frames: u32) -> Self {
        Self {
            stalling: true,
            ..Self::new(total_frames, 0)
        }
    }

    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<ExtractRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub(crate) fn take_writer(&self) -> Option<DuplexStream> {
        self.writer.lock().unwrap().take()
    }
}

impl FrameDecoder for FakeDecoder {
    async fn probe(&self, _path: &Path) -> Result<ProbeInfo, SourceError> {
        self.probe
            .ok_or_else(|| SourceError::Probe("fake: sonde refusée".to_string()))
    }

    fn open(&self, request: &ExtractRequest) -> Result<RawPipe, SourceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.stalling {
            let (reader, writer) = tokio::io::duplex(FRAME_LEN * 2);
            *self.writer.lock().unwrap() = Some(writer);
            return Ok(RawPipe::from_reader(reader));
        }

        let start = request.seek_secs.map_or(0, |t| (t * FPS).round() as usize);
        let limit = request.frame_limit.map_or(usize::MAX, |n| n as usize);
        let bytes: Vec<u8> = self
            .frames
            .iter()
            .skip(start)
            .take(limit)
            .flatten()
            .copied()
            .collect();
        Ok(RawPipe::from_reader(std::io::Cursor::new(bytes)))
    }
}
