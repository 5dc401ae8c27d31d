//! Page interleaving.
//!
//! The message and info documents are printed duplex, so the final PDF
//! alternates their pages: message 0, info 0, message 1, info 1, ...
//! Pages are moved between documents with `lopdf`; their content streams and
//! resources are carried over untouched.

use lopdf::{dictionary, Document, Object, ObjectId};

use crate::error::{CardError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Object types dropped when the two documents are combined; a fresh page
/// tree and catalog replace them.
const REBUILT_TYPES: [&[u8]; 4] = [b"Catalog", b"Pages", b"Outlines", b"Outline"];

/// Merges two PDFs page by page.
pub trait PageMerger {
    /// Returns a document of `2P` pages where page `2i` is page `i` of
    /// `messages` and page `2i + 1` is page `i` of `info`.
    fn merge_interleaved(&self, messages: &[u8], info: &[u8]) -> Result<Vec<u8>>;
}

/// [`PageMerger`] backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfMerger;

impl PageMerger for LopdfMerger {
    fn merge_interleaved(&self, messages: &[u8], info: &[u8]) -> Result<Vec<u8>> {
        interleave(messages, info)
    }
}

/// Number of pages in a PDF.
pub fn page_count(pdf: &[u8]) -> Result<usize> {
    Ok(Document::load_mem(pdf)?.get_pages().len())
}

/// Interleave the pages of two equally long PDFs.
pub fn interleave(messages: &[u8], info: &[u8]) -> Result<Vec<u8>> {
    let mut front = Document::load_mem(messages)?;
    let mut back = Document::load_mem(info)?;

    let (front_count, back_count) = (front.get_pages().len(), back.get_pages().len());
    if front_count != back_count {
        return Err(CardError::PageCountMismatch {
            messages: front_count,
            info: back_count,
        });
    }
    log::debug!("Interleaving {front_count} message and {back_count} info pages");

    // Give the info document ids above every id in the message document.
    back.renumber_objects_with(front.max_id + 1);

    let front_pages: Vec<ObjectId> = front.get_pages().into_values().collect();
    let back_pages: Vec<ObjectId> = back.get_pages().into_values().collect();
    for &page in &front_pages {
        push_down_inherited(&mut front, page)?;
    }
    for &page in &back_pages {
        push_down_inherited(&mut back, page)?;
    }

    let mut merged = Document::with_version(front.version.clone());
    for (id, object) in front.objects.into_iter().chain(back.objects) {
        let rebuilt = type_of(&object).is_some_and(|t| REBUILT_TYPES.iter().any(|r| *r == t));
        if !rebuilt {
            merged.objects.insert(id, object);
        }
    }
    merged.max_id = merged.objects.keys().map(|&(id, _)| id).max().unwrap_or(0);

    let pages_id = merged.new_object_id();
    let order: Vec<ObjectId> = front_pages
        .iter()
        .zip(&back_pages)
        .flat_map(|(&m, &i)| [m, i])
        .collect();
    for &page in &order {
        merged.get_dictionary_mut(page)?.set("Parent", pages_id);
    }

    let kids: Vec<Object> = order.iter().map(|&id| Object::Reference(id)).collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => order.len() as i64,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    merged.save_to(&mut out)?;
    Ok(out)
}

fn type_of(object: &Object) -> Option<&[u8]> {
    let dict = match object {
        Object::Dictionary(d) => d,
        Object::Stream(s) => &s.dict,
        _ => return None,
    };
    dict.get(b"Type").and_then(Object::as_name).ok()
}

/// Copy inheritable attributes from the page's ancestors onto the page
/// itself, nearest ancestor first, so it no longer depends on the page tree
/// it came from.
fn push_down_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        // Bounded walk; a malformed tree may contain a cycle.
        let mut depth = 0;
        while let Some(node_id) = parent {
            depth += 1;
            if depth > 64 {
                break;
            }
            let node = doc.get_dictionary(node_id)?;
            for key in INHERITABLE {
                if !page.has(key) && !inherited.iter().any(|(k, _)| *k == key) {
                    if let Ok(value) = node.get(key) {
                        inherited.push((key, value.clone()));
                    }
                }
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Stream};

    /// A document whose MediaBox and Resources live on the page tree root,
    /// not on the pages.
    fn inherited_doc(pages: usize, marker: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for i in 0..pages {
            let content = Stream::new(Dictionary::new(), format!("% {marker} {i}").into_bytes());
            let content_id = doc.add_object(content);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(306),
                    Object::Integer(396),
                ],
                "Resources" => Dictionary::new(),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn page_contents(pdf: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| String::from_utf8(doc.get_page_content(id).unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn pages_alternate() {
        let merged = interleave(&inherited_doc(3, "msg"), &inherited_doc(3, "info")).unwrap();
        assert_eq!(
            page_contents(&merged),
            ["% msg 0", "% info 0", "% msg 1", "% info 1", "% msg 2", "% info 2"]
        );
    }

    #[test]
    fn inherited_attributes_move_onto_pages() {
        let merged = interleave(&inherited_doc(2, "a"), &inherited_doc(2, "b")).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        for id in doc.get_pages().into_values() {
            let page = doc.get_dictionary(id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            assert_eq!(media_box.len(), 4);
            assert!(page.has(b"Resources"));
        }
    }

    #[test]
    fn mismatched_page_counts_fail() {
        let err = interleave(&inherited_doc(2, "a"), &inherited_doc(1, "b")).unwrap_err();
        assert!(matches!(
            err,
            CardError::PageCountMismatch {
                messages: 2,
                info: 1
            }
        ));
    }

    #[test]
    fn garbage_input_is_a_pdf_error() {
        let err = interleave(b"not a pdf", &inherited_doc(1, "b")).unwrap_err();
        assert!(matches!(err, CardError::Pdf(_)));
    }

    #[test]
    fn merger_and_page_count_agree() {
        let merged = LopdfMerger
            .merge_interleaved(&inherited_doc(4, "a"), &inherited_doc(4, "b"))
            .unwrap();
        assert_eq!(page_count(&merged).unwrap(), 8);
    }
}
