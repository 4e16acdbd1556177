//! Frontière avec le décodeur vidéo externe.
//!
//! Prérequis runtime : `ffmpeg` et `ffprobe` accessibles dans PATH.
//!
//! - [`FrameDecoder::probe`] : métadonnées via `ffprobe -print_format json`
//! - [`FrameDecoder::open`]  : ffmpeg → flux RGB24 brut sur stdout
//!
//! stderr est drainé en tâche de fond pendant toute la vie du pipe, sinon
//! ffmpeg peut bloquer sur un pipe de diagnostic plein.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::error::SourceError;

/// FPS retenu quand `r_frame_rate` est absent ou invalide.
pub const DEFAULT_FPS: f64 = 30.0;

/// Métadonnées extraites par la sonde.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeInfo {
    pub width: u32,
    pub height: u32,
    /// Images par seconde (ex: 23.976, 24.0, 30.0).
    pub fps: f64,
    /// Durée en secondes, 0 si inconnue.
    pub duration: f64,
    /// Estimation : `duration * fps`, sinon `nb_frames`, sinon 1.
    pub total_frames: u32,
}

/// Paramètres d'une extraction de frames brutes.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractRequest {
    pub source: PathBuf,
    /// Seek en secondes, placé avant `-i`.
    pub seek_secs: Option<f64>,
    /// Taille de sortie `(w, h)`.
    pub scale: Option<(u32, u32)>,
    /// Nombre maximal de frames émises.
    pub frame_limit: Option<u32>,
}

impl ExtractRequest {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            seek_secs: None,
            scale: None,
            frame_limit: None,
        }
    }
}

/// Lit exactement `buf.len()` octets.
///
/// Retourne `Ok(false)` sur EOF propre (aucun octet lu), une erreur
/// [`SourceError::ShortRead`] si le flux s'arrête au milieu d'une frame.
///
/// # Errors
/// I/O errors from the reader, or a short read.
pub async fn read_exact_or_eof<R: AsyncRead + Unpin + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<bool, SourceError> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]).await {
            Ok(0) if total == 0 => return Ok(false),
            Ok(0) => {
                return Err(SourceError::ShortRead {
                    expected: buf.len(),
                    actual: total,
                });
            }
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Flux d'octets RGB24 bruts, avec le processus qui le produit.
///
/// Le processus est lancé avec `kill_on_drop` : abandonner le pipe suffit à
/// le tuer, [`RawPipe::close`] attend en plus sa terminaison.
pub struct RawPipe {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    child: Option<Child>,
    stderr_drain: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for RawPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawPipe")
            .field("pid", &self.child.as_ref().and_then(Child::id))
            .finish_non_exhaustive()
    }
}

impl RawPipe {
    /// Pipe sans processus (lecteur en mémoire, tests).
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            child: None,
            stderr_drain: None,
        }
    }

    /// Prend stdout du processus et lance le drain de stderr.
    ///
    /// # Errors
    /// Returns [`SourceError::Extract`] if stdout was not piped.
    pub fn from_child(mut child: Child, label: &'static str) -> Result<Self, SourceError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Extract(format!("{label}: stdout non capturé")))?;
        let stderr_drain = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    log::debug!("{label}: {line}");
                }
            })
        });
        Ok(Self {
            reader: Box::new(stdout),
            child: Some(child),
            stderr_drain,
        })
    }

    /// Lit la frame suivante dans `buf` (taille exacte d'une frame).
    ///
    /// # Errors
    /// See [`read_exact_or_eof`].
    pub async fn read_frame(&mut self, buf: &mut [u8]) -> Result<bool, SourceError> {
        read_exact_or_eof(&mut self.reader, buf).await
    }

    /// Process id, if the pipe is backed by a running process.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Ferme le flux, tue le processus et attend sa fin et celle du drain.
    pub async fn close(self) {
        let Self {
            reader,
            child,
            stderr_drain,
        } = self;
        drop(reader);

        if let Some(mut child) = child {
            // déjà terminé : start_kill échoue sans conséquence
            let _ = child.start_kill();
            match child.wait().await {
                Ok(status) => log::debug!("décodeur terminé : {status}"),
                Err(e) => log::warn!("attente du décodeur impossible : {e}"),
            }
        }
        if let Some(drain) = stderr_drain {
            let _ = drain.await;
        }
    }
}

/// Décodeur vidéo : sonde + extraction de frames brutes.
pub trait FrameDecoder: Send + Sync + 'static {
    /// Probe geometry and timing of `path`.
    fn probe(&self, path: &Path) -> impl Future<Output = Result<ProbeInfo, SourceError>> + Send;

    /// Start emitting RGB24 frames for `request`.
    ///
    /// # Errors
    /// Returns [`SourceError::Spawn`] if the decoder cannot be started.
    fn open(&self, request: &ExtractRequest) -> Result<RawPipe, SourceError>;
}

/// Décodeur ffmpeg/ffprobe en subprocess.
#[derive(Clone, Debug)]
pub struct Ffmpeg {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl Ffmpeg {
    #[must_use]
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// `true` si ffmpeg et ffprobe répondent à `-version`.
    pub async fn is_available(&self) -> bool {
        for program in [&self.ffmpeg, &self.ffprobe] {
            let status = Command::new(program)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status()
                .await;
            if !matches!(status, Ok(s) if s.success()) {
                return false;
            }
        }
        true
    }
}

impl FrameDecoder for Ffmpeg {
    async fn probe(&self, path: &Path) -> Result<ProbeInfo, SourceError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| SourceError::Spawn {
                program: self.ffprobe.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SourceError::Probe(format!(
                "{} a échoué ({}) sur {}",
                self.ffprobe,
                output.status,
                path.display()
            )));
        }

        let info = parse_probe(&String::from_utf8_lossy(&output.stdout))?;
        log::info!(
            "probe: {}x{} @ {:.3}fps, {:.2}s, ~{} frames ({})",
            info.width,
            info.height,
            info.fps,
            info.duration,
            info.total_frames,
            path.display()
        );
        Ok(info)
    }

    fn open(&self, request: &ExtractRequest) -> Result<RawPipe, SourceError> {
        let child = Command::new(&self.ffmpeg)
            .args(ffmpeg_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SourceError::Spawn {
                program: self.ffmpeg.clone(),
                source,
            })?;
        log::debug!(
            "ffmpeg lancé (pid {:?}) : seek={:?} scale={:?} limit={:?}",
            child.id(),
            request.seek_secs,
            request.scale,
            request.frame_limit
        );
        RawPipe::from_child(child, "ffmpeg")
    }
}

/// Arguments ffmpeg pour une extraction RGB24 sur stdout.
///
/// `-ss` avant `-i` = seek rapide côté demuxer.
///
/// # Example
/// ```
/// use gk_source::decoder::{ffmpeg_args, ExtractRequest};
/// let mut req = ExtractRequest::new("in.mp4");
/// req.seek_secs = Some(1.5);
/// req.frame_limit = Some(1);
/// let args: Vec<String> = ffmpeg_args(&req)
///     .into_iter()
///     .map(|a| a.to_string_lossy().into_owned())
///     .collect();
/// assert_eq!(args[3..7], ["-ss", "1.5000", "-i", "in.mp4"]);
/// assert!(args.ends_with(&["-frames:v".into(), "1".into(), "-f".into(), "rawvideo".into(),
///     "-pix_fmt".into(), "rgb24".into(), "-an".into(), "pipe:1".into()]));
/// ```
#[must_use]
pub fn ffmpeg_args(request: &ExtractRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
    if let Some(t) = request.seek_secs {
        args.push("-ss".into());
        args.push(format!("{t:.4}").into());
    }
    args.push("-i".into());
    args.push(request.source.clone().into_os_string());
    if let Some((w, h)) = request.scale {
        args.push("-vf".into());
        args.push(format!("scale={w}:{h}:flags=bilinear").into());
    }
    if let Some(n) = request.frame_limit {
        args.push("-frames:v".into());
        args.push(n.to_string().into());
    }
    for a in ["-f", "rawvideo", "-pix_fmt", "rgb24", "-an", "pipe:1"] {
        args.push(a.into());
    }
    args
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Format `"num/den"` (ex: `"30000/1001"`).
fn parse_rate(rate: Option<&str>) -> f64 {
    let Some((num, den)) = rate.and_then(|r| r.trim().split_once('/')) else {
        return DEFAULT_FPS;
    };
    match (num.parse::<f64>(), den.parse::<f64>()) {
        (Ok(num), Ok(den)) if den > 0.0 && num > 0.0 => num / den,
        _ => DEFAULT_FPS,
    }
}

fn parse_secs(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0)
}

/// Interprète la sortie JSON de `ffprobe -show_streams -show_format`.
///
/// # Errors
/// Returns [`SourceError::Probe`] on malformed JSON, when no video stream is
/// present, or when the video stream has no geometry.
///
/// # Example
/// ```
/// use gk_source::decoder::parse_probe;
/// let json = r#"{
///     "streams": [{"codec_type": "video", "width": 1280, "height": 720,
///                  "r_frame_rate": "25/1", "nb_frames": "250"}],
///     "format": {"duration": "10.000000"}
/// }"#;
/// let info = parse_probe(json).unwrap();
/// assert_eq!((info.width, info.height, info.total_frames), (1280, 720, 250));
/// assert_eq!(info.fps, 25.0);
/// ```
pub fn parse_probe(json: &str) -> Result<ProbeInfo, SourceError> {
    let output: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| SourceError::Probe(format!("JSON ffprobe invalide : {e}")))?;

    let stream = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| SourceError::Probe("aucun flux vidéo".to_string()))?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(SourceError::Probe(format!(
            "dimensions vidéo invalides : {width}x{height}"
        )));
    }

    let fps = parse_rate(stream.r_frame_rate.as_deref());

    let mut duration = parse_secs(output.format.as_ref().and_then(|f| f.duration.as_deref()));
    if duration <= 0.0 {
        duration = parse_secs(stream.duration.as_deref());
    }

    let estimate = (duration * fps) as u32;
    let total_frames = if estimate > 0 {
        estimate
    } else {
        stream
            .nb_frames
            .as_deref()
            .and_then(|n| n.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(1)
    };

    Ok(ProbeInfo {
        width,
        height,
        fps,
        duration,
        total_frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_prefers_duration_times_fps() {
        let json = r#"{"streams":[
            {"codec_type":"audio"},
            {"codec_type":"video","width":640,"height":360,"r_frame_rate":"30000/1001","nb_frames":"7"}
        ],"format":{"duration":"2.0"}}"#;
        let info = parse_probe(json).unwrap();
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.total_frames, 59);
    }

    #[test]
    fn probe_falls_back_to_stream_duration_then_nb_frames() {
        let json = r#"{"streams":[{"codec_type":"video","width":8,"height":8,
            "r_frame_rate":"10/1","duration":"1.5"}]}"#;
        assert_eq!(parse_probe(json).unwrap().total_frames, 15);

        let json = r#"{"streams":[{"codec_type":"video","width":8,"height":8,
            "r_frame_rate":"0/0","nb_frames":"42"}],"format":{}}"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.fps, DEFAULT_FPS);
        assert_eq!(info.total_frames, 42);

        let json = r#"{"streams":[{"codec_type":"video","width":8,"height":8}]}"#;
        assert_eq!(parse_probe(json).unwrap().total_frames, 1);
    }

    #[test]
    fn probe_without_video_is_an_error() {
        assert!(matches!(
            parse_probe(r#"{"streams":[{"codec_type":"audio"}]}"#),
            Err(SourceError::Probe(_))
        ));
        assert!(matches!(parse_probe("{}"), Err(SourceError::Probe(_))));
        assert!(matches!(parse_probe("not json"), Err(SourceError::Probe(_))));
        assert!(matches!(
            parse_probe(r#"{"streams":[{"codec_type":"video","width":0,"height":4}]}"#),
            Err(SourceError::Probe(_))
        ));
    }

    #[test]
    fn args_include_scale_only_when_requested() {
        let mut req = ExtractRequest::new("/tmp/a b.mkv");
        let plain = ffmpeg_args(&req);
        assert!(!plain.iter().any(|a| a == "-vf"));
        assert!(plain.iter().any(|a| a == "/tmp/a b.mkv"));

        req.scale = Some((320, 180));
        let scaled = ffmpeg_args(&req);
        assert!(scaled.iter().any(|a| a == "scale=320:180:flags=bilinear"));
    }

    #[tokio::test]
    async fn read_frame_distinguishes_eof_and_short_read() {
        let mut pipe = RawPipe::from_reader(std::io::Cursor::new(vec![1u8, 2, 3, 4, 5, 6, 7]));
        let mut buf = [0u8; 3];
        assert!(pipe.read_frame(&mut buf).await.unwrap());
        assert_eq!(buf, [1, 2, 3]);
        assert!(pipe.read_frame(&mut buf).await.unwrap());
        let err = pipe.read_frame(&mut buf).await.unwrap_err();
        assert!(matches!(err, SourceError::ShortRead { expected: 3, actual: 1 }));
        assert!(!pipe.read_frame(&mut buf).await.unwrap());
        pipe.close().await;
    }
}
