//! Reading and writing the zip container of a `.docx` package.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::TemplateError;

/// Main body part. A package without it is not a Word document.
pub(crate) const DOCUMENT_PART: &str = "word/document.xml";

struct PackageEntry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// In-memory copy of every entry of a `.docx` archive, in archive order.
pub(crate) struct DocxPackage {
    entries: Vec<PackageEntry>,
}

impl DocxPackage {
    pub(crate) fn read(bytes: &[u8]) -> Result<Self, TemplateError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                is_dir: file.is_dir(),
                data,
            });
        }

        if !entries.iter().any(|e| e.name == DOCUMENT_PART) {
            return Err(TemplateError::MissingPart(DOCUMENT_PART.to_string()));
        }

        Ok(Self { entries })
    }

    /// Names of the XML parts that carry user-visible text.
    pub(crate) fn text_part_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir && is_text_part(&e.name))
            .map(|e| e.name.clone())
            .collect()
    }

    pub(crate) fn part_text(&self, name: &str) -> Result<Option<String>, TemplateError> {
        match self.entries.iter().find(|e| e.name == name) {
            Some(entry) => String::from_utf8(entry.data.clone())
                .map(Some)
                .map_err(|_| TemplateError::Encoding {
                    part: name.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Serialize the package, substituting `replacements` for the parts they name.
    pub(crate) fn write_with(
        &self,
        replacements: &[(String, String)],
    ) -> Result<Vec<u8>, TemplateError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }
            writer.start_file(entry.name.as_str(), options)?;
            match replacements.iter().find(|(name, _)| *name == entry.name) {
                Some((_, xml)) => writer.write_all(xml.as_bytes())?,
                None => writer.write_all(&entry.data)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }
}

fn is_text_part(name: &str) -> bool {
    if name == DOCUMENT_PART || name == "word/footnotes.xml" || name == "word/endnotes.xml" {
        return true;
    }
    (name.starts_with("word/header") || name.starts_with("word/footer")) && name.ends_with(".xml")
}
