//! Watermark Tile Generator: the repeated, rotated, semi-transparent text
//! layer for one page.
//!
//! The overlay is a PDF content stream, not a bitmap: one long run of the
//! watermark text (text + " · ", repeated) drawn at a sequence of vertical
//! offsets, each translated left of the page edge and rotated, so the runs
//! sweep diagonally across the whole page. Offsets start below the page top
//! and end above the page bottom, which is what keeps the corners covered
//! despite the rotation.
//!
//! Fill alpha cannot be set inline in a PDF content stream; it rides in an
//! ExtGState (`/ca`, `/CA`) that the compositor installs into the page's
//! resources under [`GS_NAME`], together with a Helvetica font entry under
//! [`FONT_NAME`].
//!
//! Purely deterministic given its inputs; the only failure mode is stream
//! encoding, which propagates rather than degrading to an empty overlay.

use crate::config::Orientation;
use crate::error::FiligraneError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, StringFormat};

/// Resource name of the watermark graphics state in the page's /ExtGState.
pub const GS_NAME: &str = "wmGS";

/// Resource name of the watermark font in the page's /Font.
pub const FONT_NAME: &str = "wmHelv";

/// Watermark fill gray level (0.3 on all three RGB components).
const FILL_GRAY: f32 = 0.3;

/// Tiling parameters for one page size.
///
/// Portrait pages use a fixed set calibrated for A4; landscape pages scale
/// step, shift and repeat count with the page dimensions so tile density
/// stays visually consistent on wide pages. Both sets sweep offsets from
/// below the page top to above the page bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileParams {
    pub font_size: f32,
    /// Vertical distance between consecutive text runs, in points.
    pub step_y: f32,
    /// How many times the text (plus separator) is repeated per run.
    pub repeat_count: usize,
    /// Horizontal translation of every run; negative so the rotated run
    /// enters from left of the page edge.
    pub x_shift: f32,
    /// First vertical offset (below the page bottom).
    pub y_start: f32,
    /// Offsets stop once they pass this value (above the page top).
    pub y_end: f32,
}

impl TileParams {
    /// Select the parameter set matching the page's orientation.
    pub fn for_page(width: f32, height: f32) -> Self {
        match Orientation::of_page(width, height) {
            Orientation::Portrait => Self {
                font_size: 11.0,
                step_y: 140.0,
                repeat_count: 120,
                x_shift: -500.0,
                y_start: -400.0,
                y_end: height + 800.0,
            },
            Orientation::Landscape => Self {
                font_size: 15.0,
                step_y: height * 0.14,
                repeat_count: 80,
                x_shift: -(width * 0.6),
                y_start: -(height * 1.5),
                y_end: height * 2.0,
            },
        }
    }
}

/// Build the overlay content stream for one page.
///
/// `page_index` (0-based) applies a deterministic vertical phase shift of up
/// to one third of a step so consecutive pages do not tile identically.
pub fn tile_content(
    text: &str,
    width: f32,
    height: f32,
    page_index: usize,
    angle_degrees: f32,
) -> Result<Vec<u8>, FiligraneError> {
    let params = TileParams::for_page(width, height);
    let run = encode_latin1(&repeated_run(text, params.repeat_count));

    let rad = angle_degrees.to_radians();
    let (sin, cos) = rad.sin_cos();

    let phase = (page_index % 3) as f32 * (params.step_y / 3.0);

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(GS_NAME.as_bytes().to_vec())]),
        Operation::new(
            "rg",
            vec![
                Object::Real(FILL_GRAY),
                Object::Real(FILL_GRAY),
                Object::Real(FILL_GRAY),
            ],
        ),
    ];

    let mut y = params.y_start - phase;
    while y < params.y_end {
        operations.push(Operation::new("q", vec![]));
        // Translate-then-rotate as a single matrix.
        operations.push(Operation::new(
            "cm",
            vec![
                Object::Real(cos),
                Object::Real(sin),
                Object::Real(-sin),
                Object::Real(cos),
                Object::Real(params.x_shift),
                Object::Real(y),
            ],
        ));
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_NAME.as_bytes().to_vec()),
                Object::Real(params.font_size),
            ],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(0), Object::Integer(0)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(run.clone(), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
        operations.push(Operation::new("Q", vec![]));

        y += params.step_y;
    }

    operations.push(Operation::new("Q", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| FiligraneError::Structure(format!("watermark stream encoding failed: {e}")))
}

/// The ExtGState dictionary carrying the watermark alpha.
pub fn graphics_state(opacity: f32) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(opacity)),
        ("CA", Object::Real(opacity)),
    ])
}

/// The watermark font dictionary (Helvetica, WinAnsi so the separator's
/// middle dot encodes as a single byte).
pub fn font_dict() -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}

/// One long run: the text plus the " · " separator, repeated.
fn repeated_run(text: &str, repeat_count: usize) -> String {
    let unit = format!("{text} \u{00B7} ");
    unit.repeat(repeat_count)
}

/// Map to WinAnsi (Latin-1) bytes; characters outside it become '?'.
fn encode_latin1(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xFF {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}
