use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use gk_core::config::VideoConfig;
use gk_core::settings::ConversionSettings;
use gk_effects::EffectRegistry;
use gk_source::decoder::DEFAULT_FPS;
use gk_source::{CancelToken, ImageService, VideoService};
use tokio::time::MissedTickBehavior;

use crate::cli::{OutputArgs, VideoArgs};
use crate::render;

/// `glyphkit effects` : nom et description, dans l'ordre du registre.
///
/// # Errors
/// Stdout write errors.
pub fn list_effects(registry: &EffectRegistry) -> Result<()> {
    let mut out = std::io::stdout().lock();
    for (name, description) in registry.list() {
        writeln!(out, "{name:<10} {description}")?;
    }
    Ok(())
}

/// `glyphkit image <path>`.
///
/// # Errors
/// Unreadable or undecodable image, or stdout write errors.
pub fn convert_image(
    registry: Arc<EffectRegistry>,
    path: &Path,
    settings: &ConversionSettings,
    output: OutputArgs,
) -> Result<()> {
    let frame = ImageService::new(registry)
        .convert_file(path, settings)
        .with_context(|| format!("Conversion de {}", path.display()))?;
    let mut out = std::io::stdout().lock();
    render::write_frame(&mut out, &frame, output)?;
    out.flush()?;
    Ok(())
}

/// `glyphkit video <path> ...` : une session le temps de la commande.
///
/// # Errors
/// Unreadable upload, probe or extraction failure, or stdout write errors.
pub async fn run_video(
    config: VideoConfig,
    registry: Arc<EffectRegistry>,
    args: &VideoArgs,
    settings: &ConversionSettings,
    output: OutputArgs,
) -> Result<()> {
    let service = Arc::new(VideoService::new(config, registry));
    let sweeper = service.spawn_sweeper();
    let result = drive(&service, args, settings, output).await;
    sweeper.abort();
    service.shutdown().await;
    log::info!("métriques : {:?}", service.metrics());
    result
}

async fn drive(
    service: &VideoService,
    args: &VideoArgs,
    settings: &ConversionSettings,
    output: OutputArgs,
) -> Result<()> {
    let mut file = tokio::fs::File::open(&args.path)
        .await
        .with_context(|| format!("Ouverture de {}", args.path.display()))?;
    let name = args
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let session = service
        .create_session(&mut file, &name)
        .await
        .with_context(|| format!("Session vidéo pour {}", args.path.display()))?;
    let id = session.id();

    if args.preload {
        let extracted = service
            .preload_frames(id, |done, total| {
                if done % 50 == 0 || done == total {
                    log::info!("préchargement : {done}/{total}");
                }
            })
            .await
            .context("Préchargement")?;
        log::info!("{extracted} frames en cache");
    }

    if let Some(index) = args.frame {
        let frame = service
            .get_frame(id, index, settings)
            .await
            .with_context(|| format!("Frame {index}"))?
            .context("Session expirée")?;
        let mut out = std::io::stdout().lock();
        render::write_frame(&mut out, &frame, output)?;
        out.flush()?;
    } else if let Some(count) = args.batch {
        let frames = service
            .get_frame_batch(id, args.start, count, settings)
            .await?
            .context("Session expirée")?;
        if frames.is_empty() {
            log::warn!("aucune frame en cache à partir de {} (voir --preload)", args.start);
        }
        let mut out = std::io::stdout().lock();
        for frame in &frames {
            render::write_frame(&mut out, frame, output)?;
        }
        out.flush()?;
    } else if args.stream {
        play(service, id, settings, output).await?;
    } else {
        println!("{}", serde_json::to_string_pretty(&session.info())?);
    }
    Ok(())
}

/// Lecture au rythme de la source ; Ctrl-C annule le flux.
async fn play(
    service: &VideoService,
    id: &str,
    settings: &ConversionSettings,
    output: OutputArgs,
) -> Result<()> {
    let fps = service.session(id).map_or(DEFAULT_FPS, |s| s.fps());
    let cancel = CancelToken::new();
    let mut stream = service
        .stream_frames(id, settings, cancel.clone())
        .context("Session expirée")?;

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Ctrl-C : arrêt du flux");
            cancel.cancel();
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps.max(1.0)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut shown = 0u32;
    let result = loop {
        let Some(item) = stream.next().await else {
            break Ok(());
        };
        let frame = match item {
            Ok(frame) => frame,
            Err(e) => break Err(anyhow::Error::new(e).context("Flux interrompu")),
        };
        ticker.tick().await;
        let mut out = std::io::stdout().lock();
        if let Err(e) = render::redraw_frame(&mut out, &frame, output) {
            // stdout fermé (ex: `| head`) : arrêt propre
            log::debug!("sortie fermée : {e}");
            break Ok(());
        }
        shown += 1;
    };

    ctrl_c.abort();
    stream.cancel().await;
    log::info!("{shown} frames affichées");
    result
}
