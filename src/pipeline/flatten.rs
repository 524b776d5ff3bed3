//! Rasterizer/Flattener: render every page to a bitmap and rebuild the
//! document as full-page images.
//!
//! This is what makes the watermark stick: after flattening there are no
//! text or vector objects left to edit — each output page is a single JPEG
//! stretched over a MediaBox equal to the bitmap's pixel dimensions. The
//! cost is deliberate: text becomes non-selectable, files grow, and no
//! further lossless editing is possible.
//!
//! pdfium is CPU-bound and not async-safe; callers run this module inside
//! `tokio::task::spawn_blocking`. Any page that fails to render fails the
//! whole job — a partially flattened document would silently leave some
//! pages strippable.

use crate::config::WatermarkConfig;
use crate::error::FiligraneError;
use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// A rendered page ready for reassembly.
pub struct FlatPage {
    pub width_px: u32,
    pub height_px: u32,
    pub jpeg: Vec<u8>,
}

/// Flatten `input` into `output`: rasterise every page at the configured
/// DPI and write a fresh document of full-page image pages.
///
/// Returns the output page count.
pub fn flatten_file(
    input: &Path,
    output: &Path,
    config: &WatermarkConfig,
) -> Result<usize, FiligraneError> {
    let pages = render_pages(input, config)?;
    let page_count = pages.len();
    let mut doc = image_document(pages)?;

    let mut file =
        std::fs::File::create(output).map_err(|e| FiligraneError::OutputWriteFailed {
            path: output.to_path_buf(),
            source: e,
        })?;
    doc.save_to(&mut file)
        .map_err(|e| FiligraneError::Structure(format!("failed to write flattened PDF: {e}")))?;

    info!(
        "Flattened {} pages at {} DPI → {}",
        page_count,
        config.dpi,
        output.display()
    );
    Ok(page_count)
}

/// Rasterise every page of `input` to a JPEG at the configured DPI.
fn render_pages(input: &Path, config: &WatermarkConfig) -> Result<Vec<FlatPage>, FiligraneError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(input, None)
        .map_err(|e| FiligraneError::Structure(format!("pdfium could not open intermediate: {e:?}")))?;

    // Scale factor, not target pixels: page sizes inside one document can
    // differ and each must come out at the same DPI.
    let scale = config.dpi as f32 / 72.0;
    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

    let mut pages = Vec::with_capacity(document.pages().len() as usize);

    for (index, page) in document.pages().iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| FiligraneError::RasterisationFailed {
                page: index + 1,
                detail: format!("{e:?}"),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );

        // JPEG carries no alpha; the render is over a white background.
        let rgb = image.to_rgb8();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, config.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|e| FiligraneError::ImageEncodingFailed {
                page: index + 1,
                detail: e.to_string(),
            })?;

        pages.push(FlatPage {
            width_px: rgb.width(),
            height_px: rgb.height(),
            jpeg,
        });
    }

    Ok(pages)
}

/// Assemble rendered pages into a fresh image-only document.
///
/// Each page's MediaBox equals its bitmap's pixel dimensions and its sole
/// content draws the image over the full page.
pub(crate) fn image_document(pages: Vec<FlatPage>) -> Result<Document, FiligraneError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for page in pages {
        let image_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::from_iter([
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Image".to_vec())),
                ("Width", Object::Integer(page.width_px as i64)),
                ("Height", Object::Integer(page.height_px as i64)),
                ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
                ("BitsPerComponent", Object::Integer(8)),
                ("Filter", Object::Name(b"DCTDecode".to_vec())),
            ]),
            page.jpeg,
        )));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(page.width_px as i64),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(page.height_px as i64),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content.encode().map_err(|e| {
            FiligraneError::Structure(format!("page content encoding failed: {e}"))
        })?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let resources = Dictionary::from_iter([(
            "XObject",
            Object::Dictionary(Dictionary::from_iter([(
                "Im0",
                Object::Reference(image_id),
            )])),
        )]);

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
            (
                "MediaBox",
                Object::Array(vec![
                    0.into(),
                    0.into(),
                    Object::Integer(page.width_px as i64),
                    Object::Integer(page.height_px as i64),
                ]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    Ok(doc)
}
