//! Merger: concatenate the pages of N source documents, in input order.
//!
//! Source documents are renumbered into one object space, their page objects
//! re-parented under a single new Pages tree, and everything else (fonts,
//! images, content streams) carried across untouched. Page order is tracked
//! in a `Vec`, not keyed by object id — renumbering makes ids monotonic per
//! document but nothing guarantees that across documents, and the output
//! page order must be exactly the input order.

use crate::error::FiligraneError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Load a source document, mapping parse failures to a per-input error.
///
/// `index` is the 1-based position in the job's input list.
pub fn load_document(path: &Path, index: usize) -> Result<Document, FiligraneError> {
    Document::load(path).map_err(|e| FiligraneError::MalformedDocument {
        index,
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Merge the pages of `docs` into a single document, preserving input order.
///
/// Returns [`FiligraneError::EmptyJob`] when `docs` is empty or no document
/// contributes any pages.
pub fn merge_documents(docs: Vec<Document>) -> Result<Document, FiligraneError> {
    if docs.is_empty() {
        return Err(FiligraneError::EmptyJob {
            detail: "no input documents".into(),
        });
    }

    let mut merged = Document::with_version("1.5");
    let mut max_id: u32 = 1;
    let mut ordered_pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut carried_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in docs {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        // get_pages is keyed by 1-based page number, so iterating it walks
        // the document in page order.
        for (_, page_id) in doc.get_pages() {
            let mut page_dict = doc
                .get_object(page_id)
                .and_then(Object::as_dict)
                .map_err(|e| FiligraneError::Structure(format!("unreadable page object: {e}")))?
                .clone();

            // The source Pages tree is dropped below, so attributes the page
            // inherits from it (MediaBox, Resources, Rotate) must land on the
            // page itself or they are lost.
            for key in [
                b"Resources".as_slice(),
                b"MediaBox",
                b"CropBox",
                b"Rotate",
            ] {
                if page_dict.get(key).is_err() {
                    if let Some(value) = inherited_attribute(&doc, &page_dict, key) {
                        page_dict.set(key, value);
                    }
                }
            }

            ordered_pages.push((page_id, page_dict));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or("") {
                "Catalog" | "Pages" | "Page" | "Outlines" | "Outline" => {}
                _ => {
                    carried_objects.insert(object_id, object);
                }
            }
        }
    }

    if ordered_pages.is_empty() {
        return Err(FiligraneError::EmptyJob {
            detail: "input documents contain no pages".into(),
        });
    }

    debug!("Merging {} pages into one document", ordered_pages.len());

    merged.objects.extend(carried_objects);

    // Carried objects occupy ids up to the running renumber counter; sync
    // max_id so the new Pages and Catalog ids do not overwrite them.
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = ordered_pages
        .iter()
        .map(|(id, _)| Object::Reference(*id))
        .collect();
    let page_count = ordered_pages.len();

    for (page_id, mut page_dict) in ordered_pages {
        page_dict.set("Parent", Object::Reference(pages_id));
        merged.objects.insert(page_id, Object::Dictionary(page_dict));
    }

    merged.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(page_count as i64)),
        ])),
    );

    let catalog_id = merged.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    merged.renumber_objects();
    merged.compress();

    Ok(merged)
}

/// Look up an inheritable page attribute on the page's ancestors, with a
/// depth limit on malformed parent chains.
fn inherited_attribute(doc: &Document, page_dict: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page_dict.get(b"Parent").ok().cloned();
    for _ in 0..10 {
        let id = match parent {
            Some(Object::Reference(id)) => id,
            _ => return None,
        };
        let dict = doc.get_object(id).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        parent = dict.get(b"Parent").ok().cloned();
    }
    None
}
