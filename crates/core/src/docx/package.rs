use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::write_failed;
use crate::Result;

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
pub(crate) const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

struct Part {
    name: String,
    data: Vec<u8>,
}

/// An unpacked `.docx` package. Part order is kept when writing back.
pub(crate) struct Package {
    parts: Vec<Part>,
}

impl Package {
    pub(crate) fn read(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(write_failed)?;
        let mut parts = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index).map_err(write_failed)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            file.read_to_end(&mut data).map_err(write_failed)?;
            parts.push(Part { name: file.name().to_string(), data });
        }

        Ok(Self { parts })
    }

    pub(crate) fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts.iter().find(|part| part.name == name).map(|part| part.data.as_slice())
    }

    /// Gets a part as UTF-8 text.
    pub(crate) fn get_text(&self, name: &str) -> Result<String> {
        let data = self
            .get(name)
            .ok_or_else(|| write_failed(format!("template has no {}", name)))?;
        String::from_utf8(data.to_vec()).map_err(write_failed)
    }

    /// Replaces a part, or appends it when missing.
    pub(crate) fn set(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|part| part.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part { name: name.to_string(), data }),
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|part| part.name.as_str())
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opt = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for part in &self.parts {
            zip.start_file(part.name.as_str(), opt).map_err(write_failed)?;
            zip.write_all(&part.data).map_err(write_failed)?;
        }

        let cursor = zip.finish().map_err(write_failed)?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package_bytes(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opt = SimpleFileOptions::default();
        for (name, data) in parts {
            zip.start_file(*name, opt).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_parts_survive_rewrite() {
        let bytes = package_bytes(&[(CONTENT_TYPES_PART, "<Types/>"), (DOCUMENT_PART, "<w:document/>")]);
        let mut package = Package::read(&bytes).unwrap();
        package.set(DOCUMENT_PART, b"<w:document>changed</w:document>".to_vec());
        package.set("word/media/report_image1.png", vec![1, 2, 3]);

        let reread = Package::read(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(reread.get(CONTENT_TYPES_PART), Some(b"<Types/>".as_slice()));
        assert_eq!(reread.get_text(DOCUMENT_PART).unwrap(), "<w:document>changed</w:document>");
        assert_eq!(reread.get("word/media/report_image1.png"), Some([1u8, 2, 3].as_slice()));
        assert!(!reread.contains(DOCUMENT_RELS_PART));
    }

    #[test]
    fn test_declared_size_is_not_trusted() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(DOCUMENT_PART, SimpleFileOptions::default().compression_method(CompressionMethod::Stored))
            .unwrap();
        zip.write_all(b"<w:document/>").unwrap();
        let mut bytes = zip.finish().unwrap().into_inner();

        let central = bytes.windows(4).position(|w| w == [0x50, 0x4b, 0x01, 0x02]).unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());

        match Package::read(&bytes) {
            Ok(package) => assert!(package.get(DOCUMENT_PART).is_some_and(|data| data.len() < 64)),
            Err(e) => assert!(matches!(e, crate::ReportError::TemplateWriteFailed(_))),
        }
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            Package::read(b"plain text"),
            Err(crate::ReportError::TemplateWriteFailed(_))
        ));
    }
}
