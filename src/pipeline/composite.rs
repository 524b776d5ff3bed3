//! Page Compositor: draw the watermark overlay on top of each page.
//!
//! The overlay content stream is appended *after* the page's existing
//! content, so it paints over it. Selecting the overlay by the page's own
//! resolved MediaBox matters: a mismatched overlay still renders, it just
//! tiles misaligned — a silent correctness bug rather than an error, so the
//! dimensions are read per page, never assumed.
//!
//! Resource handling covers the shapes real-world PDFs use: `/Resources`
//! inline, as an indirect reference, or absent and inherited from the Pages
//! tree; `/Contents` as a single reference or an array.

use crate::config::WatermarkConfig;
use crate::error::FiligraneError;
use crate::pipeline::tile;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Composite a watermark onto every page of `doc`, in place.
///
/// Returns the number of pages watermarked.
pub fn apply_watermark(
    doc: &mut Document,
    text: &str,
    config: &WatermarkConfig,
) -> Result<usize, FiligraneError> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(FiligraneError::EmptyJob {
            detail: "document has no pages".into(),
        });
    }

    // One graphics state and one font object shared by all pages.
    let gs_id = doc.add_object(Object::Dictionary(tile::graphics_state(config.opacity)));
    let font_id = doc.add_object(Object::Dictionary(tile::font_dict()));

    for (index, page_id) in page_ids.iter().copied().enumerate() {
        let media_box = resolve_media_box(doc, page_id)?;
        let width = media_box[2] - media_box[0];
        let height = media_box[3] - media_box[1];
        debug!(
            "Watermarking page {} ({}x{} pt)",
            index + 1,
            width,
            height
        );

        let content = tile::tile_content(text, width, height, index, config.angle_degrees)?;
        let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));

        let resources = overlay_resources(doc, page_id, gs_id, font_id)?;

        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| FiligraneError::Structure(format!("page {} unreadable: {e}", index + 1)))?;

        append_content(page, content_id);
        page.set("Resources", Object::Dictionary(resources));
    }

    Ok(page_ids.len())
}

/// Append a content stream reference after the page's existing content.
fn append_content(page: &mut Dictionary, content_id: ObjectId) {
    match page.get(b"Contents").ok().cloned() {
        Some(Object::Reference(existing)) => {
            page.set(
                "Contents",
                Object::Array(vec![
                    Object::Reference(existing),
                    Object::Reference(content_id),
                ]),
            );
        }
        Some(Object::Array(mut arr)) => {
            arr.push(Object::Reference(content_id));
            page.set("Contents", Object::Array(arr));
        }
        _ => {
            page.set("Contents", Object::Reference(content_id));
        }
    }
}

/// The page's effective resource dictionary with the watermark ExtGState and
/// font merged in. Returned by value; the caller sets it inline on the page,
/// which also resolves the inherited-resources case.
fn overlay_resources(
    doc: &Document,
    page_id: ObjectId,
    gs_id: ObjectId,
    font_id: ObjectId,
) -> Result<Dictionary, FiligraneError> {
    let mut resources = effective_resources(doc, page_id);

    let mut ext_gstate = resolved_subdict(doc, &resources, b"ExtGState");
    ext_gstate.set(tile::GS_NAME, Object::Reference(gs_id));
    resources.set("ExtGState", Object::Dictionary(ext_gstate));

    let mut fonts = resolved_subdict(doc, &resources, b"Font");
    fonts.set(tile::FONT_NAME, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    Ok(resources)
}

/// Walk the page and its ancestors for the first `/Resources` entry.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = doc.get_object(page_id).ok();
    for _ in 0..10 {
        let dict = match current.and_then(|o| o.as_dict().ok()) {
            Some(d) => d,
            None => break,
        };
        if let Ok(res) = dict.get(b"Resources") {
            if let Some(d) = resolve_dict(doc, res) {
                return d;
            }
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => doc.get_object(*parent_id).ok(),
            _ => None,
        };
    }
    Dictionary::new()
}

/// A named sub-dictionary of `resources`, resolved through an indirect
/// reference if needed; empty when absent.
fn resolved_subdict(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|o| resolve_dict(doc, o))
        .unwrap_or_default()
}

fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(d)) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Resolve a page's MediaBox, walking up the Pages tree with a depth limit
/// on malformed parent chains. Defaults to US Letter when absent entirely.
pub fn resolve_media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4], FiligraneError> {
    let mut current = doc
        .get_object(page_id)
        .map_err(|e| FiligraneError::Structure(format!("missing page object: {e}")))
        .ok();

    for _ in 0..10 {
        let dict = match current.and_then(|o| o.as_dict().ok()) {
            Some(d) => d,
            None => break,
        };

        if let Ok(media_box_obj) = dict.get(b"MediaBox") {
            let arr = match media_box_obj {
                Object::Array(arr) => Some(arr.clone()),
                Object::Reference(id) => match doc.get_object(*id) {
                    Ok(Object::Array(arr)) => Some(arr.clone()),
                    _ => None,
                },
                _ => None,
            };
            if let Some(arr) = arr {
                let values: Vec<f32> = arr
                    .iter()
                    .filter_map(|o| match o {
                        Object::Integer(i) => Some(*i as f32),
                        Object::Real(r) => Some(*r),
                        _ => None,
                    })
                    .collect();
                if values.len() == 4 {
                    return Ok([values[0], values[1], values[2], values[3]]);
                }
            }
        }

        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => doc.get_object(*parent_id).ok(),
            _ => None,
        };
    }

    Ok([0.0, 0.0, 612.0, 792.0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil::single_page_pdf;
    use lopdf::content::Content;

    fn watermark_one(width: f32, height: f32) -> Document {
        let mut doc = single_page_pdf("body", width, height);
        let config = WatermarkConfig::default();
        let n = apply_watermark(&mut doc, "CONFIDENTIAL", &config).expect("compositing succeeds");
        assert_eq!(n, 1);
        doc
    }

    fn overlay_stream(doc: &Document) -> Vec<u8> {
        let (_, page_id) = doc.get_pages().into_iter().next().expect("one page");
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let contents = page.get(b"Contents").unwrap();
        let ids = match contents {
            Object::Array(arr) => arr.clone(),
            other => panic!("Contents should be an array after compositing, got {other:?}"),
        };
        assert_eq!(ids.len(), 2, "original stream + overlay stream");
        let overlay_id = match ids.last().unwrap() {
            Object::Reference(id) => *id,
            other => panic!("expected reference, got {other:?}"),
        };
        match doc.get_object(overlay_id).unwrap() {
            Object::Stream(s) => s.content.clone(),
            other => panic!("expected stream, got {other:?}"),
        }
    }

    #[test]
    fn overlay_appended_after_existing_content() {
        let doc = watermark_one(595.0, 842.0);
        let content = overlay_stream(&doc);
        let decoded = Content::decode(&content).expect("overlay parses");
        assert!(decoded.operations.iter().any(|op| op.operator == "Tj"));
    }

    #[test]
    fn resources_gain_gstate_and_font() {
        let doc = watermark_one(595.0, 842.0);
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();

        let gs = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        let gs_ref = gs.get(tile::GS_NAME.as_bytes()).expect("wmGS installed");
        let gs_dict = match gs_ref {
            Object::Reference(id) => doc.get_object(*id).unwrap().as_dict().unwrap(),
            other => panic!("expected reference, got {other:?}"),
        };
        assert_eq!(gs_dict.get(b"ca").unwrap(), &Object::Real(0.4));

        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.get(tile::FONT_NAME.as_bytes()).is_ok());
        // The page's original font survives the merge.
        assert!(fonts.get(b"F1").is_ok());
    }

    #[test]
    fn overlay_matches_page_orientation() {
        let portrait = overlay_stream(&watermark_one(595.0, 842.0));
        let landscape = overlay_stream(&watermark_one(842.0, 595.0));

        let runs = |bytes: &[u8]| {
            Content::decode(bytes)
                .unwrap()
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .count()
        };
        assert_ne!(runs(&portrait), runs(&landscape));
    }

    #[test]
    fn media_box_resolution_falls_back_to_letter() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(Dictionary::from_iter([(
            "Type",
            Object::Name(b"Page".to_vec()),
        )]));
        let mb = resolve_media_box(&doc, page_id).expect("resolves");
        assert_eq!(mb, [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn composited_document_still_saves() {
        let mut doc = watermark_one(595.0, 842.0);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("saves");
        let reloaded = Document::load_mem(&bytes).expect("reloads");
        assert_eq!(reloaded.get_pages().len(), 1);
    }
}
