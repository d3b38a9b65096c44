//! Watermark stamping.
//!
//! Parses a fetched PDF into its object graph, stamps two marks onto every
//! page and re-serializes the result into a fresh buffer:
//!
//! - a fully legible corner mark anchored near the bottom-right corner,
//! - a faint, large mark rotated about the page center.
//!
//! One Helvetica-Bold font object and two ExtGState alpha states are
//! registered once per document and shared by all pages, so embedding cost
//! does not grow with page count. The input buffer is never mutated; the
//! transformation is a pure function of (bytes, spec).

use crate::constants::{
    CENTER_COLOR_RGB, CORNER_BOTTOM_INSET, CORNER_COLOR_RGB, CORNER_RIGHT_INSET,
    DEFAULT_WATERMARK_TEXT,
};
use crate::error::PipelineError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

/// Resource names registered on each page. The `wm` infix keeps them out
/// of the way of names already present in the source document.
const FONT_RESOURCE: &str = "FwmCB";
const CORNER_GSTATE: &str = "GSwmCorner";
const CENTER_GSTATE: &str = "GSwmCenter";

/// Visual configuration for the two per-page marks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkSpec {
    /// Text drawn by both marks.
    #[serde(default = "default_text")]
    pub text: String,

    /// Opacity of the corner mark (0.0 to 1.0).
    #[serde(default = "default_corner_opacity")]
    pub corner_opacity: f64,

    /// Opacity of the rotated center mark (0.0 to 1.0).
    #[serde(default = "default_center_opacity")]
    pub center_opacity: f64,

    /// Font size of the corner mark, in points.
    #[serde(default = "default_corner_font_size")]
    pub corner_font_size: u32,

    /// Font size of the center mark, in points.
    #[serde(default = "default_center_font_size")]
    pub center_font_size: u32,

    /// Rotation of the center mark about the page center, in radians.
    #[serde(default = "default_rotation_radians")]
    pub rotation_radians: f64,
}

fn default_text() -> String {
    DEFAULT_WATERMARK_TEXT.to_string()
}

fn default_corner_opacity() -> f64 {
    0.7
}

fn default_center_opacity() -> f64 {
    0.1
}

fn default_corner_font_size() -> u32 {
    12
}

fn default_center_font_size() -> u32 {
    48
}

fn default_rotation_radians() -> f64 {
    std::f64::consts::FRAC_PI_4
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: default_text(),
            corner_opacity: default_corner_opacity(),
            center_opacity: default_center_opacity(),
            corner_font_size: default_corner_font_size(),
            center_font_size: default_center_font_size(),
            rotation_radians: default_rotation_radians(),
        }
    }
}

/// Stamp the watermark onto every page of a PDF.
///
/// Returns a new byte buffer; the input is left untouched. Zero-page
/// documents succeed trivially, and pages with differing sizes are each
/// stamped relative to their own MediaBox.
///
/// # Errors
///
/// - `PipelineError::Parse` when the buffer is not a well-formed PDF.
/// - `PipelineError::Render` when resource wiring, content encoding, or
///   re-serialization fails.
pub fn stamp(bytes: &[u8], spec: &WatermarkSpec) -> Result<Vec<u8>, PipelineError> {
    let mut doc = Document::load_mem(bytes)
        .map_err(|e| PipelineError::Parse(format!("failed to load PDF: {}", e)))?;

    // Shared resources, registered once for the whole document.
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let corner_gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => spec.corner_opacity,
        "CA" => spec.corner_opacity,
    });
    let center_gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => spec.center_opacity,
        "CA" => spec.center_opacity,
    });

    let page_ids: Vec<ObjectId> = doc.get_pages().values().cloned().collect();
    for page_id in page_ids {
        stamp_page(&mut doc, page_id, spec, font_id, corner_gs_id, center_gs_id)?;
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| PipelineError::Render(format!("failed to serialize PDF: {}", e)))?;

    Ok(out)
}

/// Append the watermark content stream to one page and wire up the shared
/// font and graphics-state resources.
fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    spec: &WatermarkSpec,
    font_id: ObjectId,
    corner_gs_id: ObjectId,
    center_gs_id: ObjectId,
) -> Result<(), PipelineError> {
    let (llx, lly, urx, ury) = effective_media_box(doc, page_id)
        .ok_or_else(|| PipelineError::Render("page has no MediaBox".to_string()))?;
    let (width, height) = (urx - llx, ury - lly);

    let page_dict = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| PipelineError::Render(format!("failed to read page object: {}", e)))?
        .clone();

    // Merge our entries into (a copy of) the page resources. Shared
    // resource dictionaries get duplicated inline, which keeps the other
    // pages referencing the original untouched.
    let mut resources = page_dict
        .get(b"Resources")
        .ok()
        .and_then(|obj| owned_dict(doc, obj))
        .unwrap_or_else(Dictionary::new);

    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| owned_dict(doc, obj))
        .unwrap_or_else(Dictionary::new);
    fonts.set(FONT_RESOURCE, font_id);
    resources.set("Font", Object::Dictionary(fonts));

    let mut gstates = resources
        .get(b"ExtGState")
        .ok()
        .and_then(|obj| owned_dict(doc, obj))
        .unwrap_or_else(Dictionary::new);
    gstates.set(CORNER_GSTATE, corner_gs_id);
    gstates.set(CENTER_GSTATE, center_gs_id);
    resources.set("ExtGState", Object::Dictionary(gstates));

    // Existing content is kept as-is; the watermark stream is appended
    // after it so the marks render on top. A Contents reference may point
    // at an array of streams rather than a single stream, so it has to be
    // resolved before deciding on the base list.
    let mut contents: Vec<Object> = match page_dict.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(refs)) => refs.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(refs)) => refs.clone(),
        Ok(Object::Stream(stream)) => {
            let id = doc.add_object(Object::Stream(stream.clone()));
            vec![Object::Reference(id)]
        }
        _ => Vec::new(),
    };

    let content = watermark_content(spec, llx, lly, width, height)
        .encode()
        .map_err(|e| PipelineError::Render(format!("failed to encode content: {}", e)))?;
    let watermark_id = doc.add_object(Stream::new(dictionary! {}, content));
    contents.push(Object::Reference(watermark_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PipelineError::Render(format!("failed to update page object: {}", e)))?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));

    Ok(())
}

/// Build the operations drawing both marks for a page of the given box.
fn watermark_content(
    spec: &WatermarkSpec,
    llx: f64,
    lly: f64,
    width: f64,
    height: f64,
) -> Content {
    let (cr, cg, cb) = CORNER_COLOR_RGB;
    let (zr, zg, zb) = CENTER_COLOR_RGB;

    let corner_x = llx + width - CORNER_RIGHT_INSET;
    let corner_y = lly + CORNER_BOTTOM_INSET;

    let (cx, cy) = (llx + width / 2.0, lly + height / 2.0);
    let (sin, cos) = spec.rotation_radians.sin_cos();
    let center_dx = -estimated_text_width(&spec.text, spec.center_font_size as f64) / 2.0;

    let operations = vec![
        // Corner mark, bottom-right.
        Operation::new("q", vec![]),
        Operation::new("gs", vec![CORNER_GSTATE.into()]),
        Operation::new("rg", vec![cr.into(), cg.into(), cb.into()]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![FONT_RESOURCE.into(), (spec.corner_font_size as f64).into()],
        ),
        Operation::new("Td", vec![corner_x.into(), corner_y.into()]),
        Operation::new("Tj", vec![Object::string_literal(spec.text.as_str())]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
        // Center mark, rotated about the page center.
        Operation::new("q", vec![]),
        Operation::new("gs", vec![CENTER_GSTATE.into()]),
        Operation::new("rg", vec![zr.into(), zg.into(), zb.into()]),
        Operation::new(
            "cm",
            vec![
                cos.into(),
                sin.into(),
                (-sin).into(),
                cos.into(),
                cx.into(),
                cy.into(),
            ],
        ),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![FONT_RESOURCE.into(), (spec.center_font_size as f64).into()],
        ),
        Operation::new("Td", vec![center_dx.into(), 0.0f64.into()]),
        Operation::new("Tj", vec![Object::string_literal(spec.text.as_str())]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ];

    Content { operations }
}

/// Helvetica-Bold advance widths for characters 32..=126, in 1/1000 em.
const HELVETICA_BOLD_WIDTHS: [i16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Estimate the rendered width of `text` at `font_size`, in PDF units.
///
/// Bytes outside the tabulated ASCII range fall back to a 600/1000 em
/// advance. Good enough for centering; exact metrics are not required.
fn estimated_text_width(text: &str, font_size: f64) -> f64 {
    let milli_em: f64 = text
        .bytes()
        .map(|b| {
            if (32..=126).contains(&b) {
                HELVETICA_BOLD_WIDTHS[(b - 32) as usize] as f64
            } else {
                600.0
            }
        })
        .sum();
    milli_em * font_size / 1000.0
}

/// Look up the page box, following the Parent chain for inherited boxes.
fn effective_media_box(doc: &Document, page_id: ObjectId) -> Option<(f64, f64, f64, f64)> {
    let mut dict = doc.get_object(page_id).ok()?.as_dict().ok()?;
    loop {
        if let Ok(Object::Array(values)) = dict.get(b"MediaBox") {
            if values.len() == 4 {
                return Some((
                    as_f64(&values[0])?,
                    as_f64(&values[1])?,
                    as_f64(&values[2])?,
                    as_f64(&values[3])?,
                ));
            }
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => {
                dict = doc.get_object(*parent_id).ok()?.as_dict().ok()?;
            }
            _ => return None,
        }
    }
}

fn as_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Resolve an inline or referenced dictionary into an owned copy.
fn owned_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok().cloned(),
        _ => None,
    }
}
