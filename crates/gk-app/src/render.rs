use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use gk_core::frame::GlyphFrame;

use crate::cli::OutputArgs;

/// Écrit une frame en texte brut, en glyphes colorés ou en JSON.
///
/// Le plan couleur n'est utilisé que si la frame en porte un et que la
/// sortie couleur est demandée.
///
/// # Errors
/// Propagates write and serialization errors.
pub fn write_frame<W: Write>(out: &mut W, frame: &GlyphFrame, output: OutputArgs) -> io::Result<()> {
    if output.json {
        serde_json::to_writer(&mut *out, frame)?;
        return writeln!(out);
    }
    match frame.colors.as_deref() {
        Some(colors) if output.color => write_colored(out, frame, colors),
        _ => out.write_all(frame.text.as_bytes()),
    }
}

/// Comme [`write_frame`], après retour en haut d'un écran effacé.
///
/// # Errors
/// Propagates write errors.
pub fn redraw_frame<W: Write>(out: &mut W, frame: &GlyphFrame, output: OutputArgs) -> io::Result<()> {
    if !output.json {
        queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    }
    write_frame(out, frame, output)?;
    out.flush()
}

fn write_colored<W: Write>(out: &mut W, frame: &GlyphFrame, colors: &[u8]) -> io::Result<()> {
    let mut rgb = colors.chunks_exact(3);
    let mut current: Option<[u8; 3]> = None;
    for line in frame.lines() {
        for ch in line.chars() {
            if let Some(&[r, g, b]) = rgb.next() {
                // une séquence ANSI seulement quand la couleur change
                if current != Some([r, g, b]) {
                    queue!(out, SetForegroundColor(Color::Rgb { r, g, b }))?;
                    current = Some([r, g, b]);
                }
            }
            queue!(out, Print(ch))?;
        }
        queue!(out, ResetColor, Print('\n'))?;
        current = None;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(colors: Option<Vec<u8>>) -> GlyphFrame {
        GlyphFrame {
            text: "ab\ncd\n".into(),
            columns: 2,
            rows: 2,
            colors,
            frame_index: 3,
            total_frames: 9,
        }
    }

    fn render(frame: &GlyphFrame, output: OutputArgs) -> String {
        let mut out = Vec::new();
        write_frame(&mut out, frame, output).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn plain_text_is_written_verbatim() {
        let colored = frame(Some(vec![255, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255]));
        assert_eq!(render(&colored, OutputArgs::default()), "ab\ncd\n");
        assert_eq!(render(&frame(None), OutputArgs { color: true, json: false }), "ab\ncd\n");
    }

    #[test]
    fn colored_output_switches_only_on_change() {
        let colored = frame(Some(vec![255, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255]));
        let text = render(&colored, OutputArgs { color: true, json: false });
        assert_eq!(text.matches("\x1b[38;2;255;0;0m").count(), 1);
        assert!(text.contains("\x1b[38;2;0;255;0mc"));
        assert!(text.contains("\x1b[38;2;0;0;255md"));
        assert_eq!(text.matches('\n').count(), 2);
    }

    #[test]
    fn json_output_is_one_line_camel_case() {
        let text = render(&frame(None), OutputArgs { color: false, json: true });
        assert!(text.ends_with("}\n"));
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.contains(r#""frameIndex":3"#));
        assert!(text.contains(r#""totalFrames":9"#));
    }
}
