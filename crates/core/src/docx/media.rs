use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use super::package::{CONTENT_TYPES_PART, DOCUMENT_RELS_PART, Package};
use super::write_failed;
use crate::Result;

/// EMU per pixel at 96 DPI.
const EMU_PER_PIXEL: u64 = 9525;
/// Six inches.
const MAX_WIDTH_EMU: u64 = 5_486_400;
/// Largest extent a drawing may declare (`ST_PositiveCoordinate`).
const MAX_EXTENT_EMU: u64 = 27_273_042_316_900;
const DOC_PR_BASE: usize = 1000;

const IMAGE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const EMPTY_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

/// An image accepted into the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EmbeddedImage {
    pub rel_id: String,
    pub file_name: String,
    pub doc_pr_id: usize,
    pub width_emu: u64,
    pub height_emu: u64,
}

impl EmbeddedImage {
    /// Inline picture markup for a `w:r`.
    pub(crate) fn drawing_xml(&self) -> String {
        format!(
            concat!(
                r#"<w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0" "#,
                r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{id}" name="Picture {id}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
                r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
                r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" r:embed="{rel}"/>"#,
                r#"<a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
                r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#
            ),
            cx = self.width_emu,
            cy = self.height_emu,
            id = self.doc_pr_id,
            name = self.file_name,
            rel = self.rel_id,
        )
    }
}

struct PendingImage {
    image: EmbeddedImage,
    extension: &'static str,
    content_type: &'static str,
    data: Vec<u8>,
}

/// Collects images while paragraphs are rewritten, then stores them.
pub(crate) struct MediaStore {
    next_rel: u32,
    next_file: usize,
    pending: Vec<PendingImage>,
}

impl MediaStore {
    pub(crate) fn new(package: &Package) -> Result<Self> {
        let next_rel = match package.get(DOCUMENT_RELS_PART) {
            Some(rels) => max_rel_id(&String::from_utf8_lossy(rels))? + 1,
            None => 1,
        };
        let next_file = package
            .names()
            .filter_map(|name| name.strip_prefix("word/media/report_image"))
            .filter_map(|rest| rest.split('.').next()?.parse::<usize>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        Ok(Self { next_rel, next_file, pending: Vec::new() })
    }

    /// Accepts image bytes; `None` when the format is not recognised.
    pub(crate) fn add(&mut self, data: Vec<u8>) -> Option<EmbeddedImage> {
        let (format, (width, height)) = match inspect(&data) {
            Some(found) => found,
            None => {
                warn!(size = data.len(), "Skipping image in unrecognised format");
                return None;
            }
        };
        let (extension, content_type) = media_type(format)?;

        let Some((width_emu, height_emu)) = fit_width(width, height) else {
            warn!(width, height, "Skipping image with out-of-range dimensions");
            return None;
        };
        let file_name = format!("report_image{}.{}", self.next_file, extension);
        let image = EmbeddedImage {
            rel_id: format!("rId{}", self.next_rel),
            file_name,
            doc_pr_id: DOC_PR_BASE + self.pending.len() + 1,
            width_emu,
            height_emu,
        };
        debug!(file = %image.file_name, width, height, "Embedding image");

        self.next_rel += 1;
        self.next_file += 1;
        self.pending.push(PendingImage { image: image.clone(), extension, content_type, data });
        Some(image)
    }

    /// Writes collected images, relationships and content types into the package.
    pub(crate) fn store(self, package: &mut Package) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        debug!(count = self.pending.len(), "Storing images");

        let mut rels = match package.get(DOCUMENT_RELS_PART) {
            Some(_) => package.get_text(DOCUMENT_RELS_PART)?,
            None => EMPTY_RELS.to_string(),
        };
        let mut types = package.get_text(CONTENT_TYPES_PART)?;

        for pending in self.pending {
            let relationship = format!(
                r#"<Relationship Id="{}" Type="{}" Target="media/{}"/>"#,
                pending.image.rel_id, IMAGE_REL_TYPE, pending.image.file_name
            );
            rels = insert_before(&rels, "</Relationships>", &relationship)?;

            if !types.contains(&format!(r#"Extension="{}""#, pending.extension)) {
                let default = format!(
                    r#"<Default Extension="{}" ContentType="{}"/>"#,
                    pending.extension, pending.content_type
                );
                types = insert_before(&types, "</Types>", &default)?;
            }

            package.set(&format!("word/media/{}", pending.image.file_name), pending.data);
        }

        package.set(DOCUMENT_RELS_PART, rels.into_bytes());
        package.set(CONTENT_TYPES_PART, types.into_bytes());
        Ok(())
    }
}

fn inspect(data: &[u8]) -> Option<(ImageFormat, (u32, u32))> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format().ok()?;
    let format = reader.format()?;
    let dimensions = reader.into_dimensions().ok()?;
    Some((format, dimensions))
}

fn media_type(format: ImageFormat) -> Option<(&'static str, &'static str)> {
    match format {
        ImageFormat::Png => Some(("png", "image/png")),
        ImageFormat::Jpeg => Some(("jpeg", "image/jpeg")),
        ImageFormat::Gif => Some(("gif", "image/gif")),
        ImageFormat::Bmp => Some(("bmp", "image/bmp")),
        other => {
            warn!(format = ?other, "Skipping image in unsupported format");
            None
        }
    }
}

/// Pixel size at 96 DPI, scaled down to fit the maximum width.
///
/// `None` when the scaled height is beyond what a drawing can hold.
fn fit_width(width: u32, height: u32) -> Option<(u64, u64)> {
    let width_emu = u64::from(width) * EMU_PER_PIXEL;
    let height_emu = u64::from(height) * EMU_PER_PIXEL;
    let (width_emu, height_emu) = if width_emu <= MAX_WIDTH_EMU {
        (width_emu, height_emu)
    } else {
        let scaled = u128::from(height_emu) * u128::from(MAX_WIDTH_EMU) / u128::from(width_emu);
        (MAX_WIDTH_EMU, u64::try_from(scaled).ok()?)
    };
    (height_emu <= MAX_EXTENT_EMU).then_some((width_emu, height_emu))
}

fn max_rel_id(rels: &str) -> Result<u32> {
    let mut reader = Reader::from_str(rels);
    let mut max = 0;

    loop {
        match reader.read_event().map_err(write_failed)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                if let Some(attr) = e.try_get_attribute("Id").map_err(write_failed)? {
                    let value = String::from_utf8_lossy(&attr.value);
                    if let Some(n) = value.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()) {
                        max = max.max(n);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(max)
}

fn insert_before(xml: &str, closing: &str, fragment: &str) -> Result<String> {
    let at = xml
        .rfind(closing)
        .ok_or_else(|| write_failed(format!("missing {}", closing)))?;
    let mut out = String::with_capacity(xml.len() + fragment.len());
    out.push_str(&xml[..at]);
    out.push_str(fragment);
    out.push_str(&xml[at..]);
    Ok(out)
}
