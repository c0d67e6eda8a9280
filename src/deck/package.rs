//! OPC package access: zip parts, relationships and content types.

use super::xml::{escape, splice, XmlDoc};
use crate::error::AvatarDeckError;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub(crate) const CONTENT_TYPES: &str = "[Content_Types].xml";
const PACKAGE_RELS: &str = "_rels/.rels";

pub(crate) const RT_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub(crate) const RT_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub(crate) const RT_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub(crate) const RT_NOTES_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
pub(crate) const RT_NOTES_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";
pub(crate) const RT_THEME: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
pub(crate) const RT_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub(crate) const RT_VIDEO: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/video";
pub(crate) const RT_AUDIO: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/audio";
pub(crate) const RT_MEDIA: &str = "http://schemas.microsoft.com/office/2007/relationships/media";

pub(crate) const CT_SLIDE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
pub(crate) const CT_NOTES_SLIDE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
pub(crate) const CT_NOTES_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml";
pub(crate) const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

/// One entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// All parts of a presentation, keyed by their zip path.
#[derive(Debug, Clone, Default)]
pub(crate) struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AvatarDeckError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| AvatarDeckError::invalid_deck("package", e))?;
        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| AvatarDeckError::invalid_deck("package", e))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| AvatarDeckError::invalid_deck(&name, e))?;
            parts.insert(name, data);
        }
        if !parts.contains_key(CONTENT_TYPES) {
            return Err(AvatarDeckError::invalid_deck(CONTENT_TYPES, "missing part"));
        }
        Ok(Self { parts })
    }

    /// Serialise to zip bytes; `[Content_Types].xml` is always the first entry.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AvatarDeckError> {
        let write_err = |e: String| AvatarDeckError::Internal(format!("zip write: {e}"));
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        let ordered = self
            .parts
            .iter()
            .filter(|(name, _)| name.as_str() == CONTENT_TYPES)
            .chain(self.parts.iter().filter(|(name, _)| name.as_str() != CONTENT_TYPES));
        for (name, data) in ordered {
            let method = if is_media(name) {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            zip.start_file(name.as_str(), FileOptions::default().compression_method(method))
                .map_err(|e| write_err(e.to_string()))?;
            zip.write_all(data).map_err(|e| write_err(e.to_string()))?;
        }
        let cursor = zip.finish().map_err(|e| write_err(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(|d| d.as_slice())
    }

    pub fn put(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.parts.insert(name.into(), data.into());
    }

    /// A part decoded as UTF-8 text.
    pub fn xml(&self, name: &str) -> Result<&str, AvatarDeckError> {
        let data = self
            .get(name)
            .ok_or_else(|| AvatarDeckError::invalid_deck(name, "missing part"))?;
        std::str::from_utf8(data).map_err(|e| AvatarDeckError::invalid_deck(name, e))
    }

    /// A part parsed into an element index.
    pub fn doc(&self, name: &str) -> Result<XmlDoc, AvatarDeckError> {
        XmlDoc::parse(name, self.xml(name)?)
    }

    /// First free `{stem}{n}.{ext}` with n starting at 1.
    pub fn next_part_name(&self, stem: &str, ext: &str) -> String {
        (1..)
            .map(|n| format!("{stem}{n}.{ext}"))
            .find(|name| !self.contains(name))
            .unwrap_or_else(|| format!("{stem}.{ext}"))
    }

    /// Part name of the main presentation part.
    pub fn main_part(&self) -> Result<String, AvatarDeckError> {
        let rels = self.rels_of_package()?;
        rels.iter()
            .find(|r| r.rel_type == RT_OFFICE_DOCUMENT)
            .map(|r| r.target.trim_start_matches('/').to_string())
            .ok_or_else(|| {
                AvatarDeckError::invalid_deck(PACKAGE_RELS, "no officeDocument relationship")
            })
    }

    fn rels_of_package(&self) -> Result<Vec<Relationship>, AvatarDeckError> {
        if !self.contains(PACKAGE_RELS) {
            return Err(AvatarDeckError::invalid_deck(PACKAGE_RELS, "missing part"));
        }
        parse_rels(PACKAGE_RELS, self.xml(PACKAGE_RELS)?)
    }

    /// Relationships of `part`; empty when it has no `.rels` part.
    pub fn rels(&self, part: &str) -> Result<Vec<Relationship>, AvatarDeckError> {
        let name = rels_part_name(part);
        if !self.contains(&name) {
            return Ok(Vec::new());
        }
        parse_rels(&name, self.xml(&name)?)
    }

    pub fn put_rels(&mut self, part: &str, rels: &[Relationship]) {
        self.put(rels_part_name(part), render_rels(rels));
    }

    /// Part name targeted by relationship `r_id` of `part`.
    pub fn related_part(&self, part: &str, r_id: &str) -> Result<String, AvatarDeckError> {
        self.rels(part)?
            .into_iter()
            .find(|r| r.id == r_id && !r.external)
            .map(|r| resolve_target(part, &r.target))
            .ok_or_else(|| {
                AvatarDeckError::invalid_deck(part, format!("no relationship '{r_id}'"))
            })
    }

    /// First part related to `part` with type `rel_type`.
    pub fn related_by_type(
        &self,
        part: &str,
        rel_type: &str,
    ) -> Result<Option<String>, AvatarDeckError> {
        Ok(self
            .rels(part)?
            .into_iter()
            .find(|r| r.rel_type == rel_type && !r.external)
            .map(|r| resolve_target(part, &r.target)))
    }

    /// Add a relationship from `from` to part `to`; returns the new `rId`.
    pub fn relate(
        &mut self,
        from: &str,
        rel_type: &str,
        to: &str,
    ) -> Result<String, AvatarDeckError> {
        let mut rels = self.rels(from)?;
        let next = rels
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{next}");
        rels.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: relative_target(from, to),
            external: false,
        });
        self.put_rels(from, &rels);
        Ok(id)
    }

    /// Register a `Default` content type for `ext` unless one exists.
    pub fn ensure_default_type(
        &mut self,
        ext: &str,
        content_type: &str,
    ) -> Result<(), AvatarDeckError> {
        let doc = self.doc(CONTENT_TYPES)?;
        let known = doc
            .find("Default")
            .any(|n| n.attr("Extension").is_some_and(|e| e.eq_ignore_ascii_case(ext)));
        if known {
            return Ok(());
        }
        let entry = format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            escape(ext),
            escape(content_type)
        );
        self.insert_type_entry(doc, &entry)
    }

    /// Register an `Override` content type for `part`.
    pub fn add_override_type(
        &mut self,
        part: &str,
        content_type: &str,
    ) -> Result<(), AvatarDeckError> {
        let doc = self.doc(CONTENT_TYPES)?;
        let part_name = format!("/{part}");
        if doc
            .find("Override")
            .any(|n| n.attr("PartName") == Some(part_name.as_str()))
        {
            return Ok(());
        }
        let entry = format!(
            r#"<Override PartName="{}" ContentType="{}"/>"#,
            escape(&part_name),
            escape(content_type)
        );
        self.insert_type_entry(doc, &entry)
    }

    fn insert_type_entry(&mut self, doc: XmlDoc, entry: &str) -> Result<(), AvatarDeckError> {
        let root = doc
            .first("Types")
            .ok_or_else(|| AvatarDeckError::invalid_deck(CONTENT_TYPES, "no <Types> root"))?;
        let text = match root.append_at() {
            Some(at) => splice(&doc.text, at..at, entry),
            None => {
                let open = doc.raw(root).trim_end_matches("/>").to_string();
                splice(&doc.text, root.start..root.end, &format!("{open}>{entry}</Types>"))
            }
        };
        self.put(CONTENT_TYPES, text);
        Ok(())
    }
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`.
pub(crate) fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target relative to the directory of `source`.
pub(crate) fn resolve_target(source: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Relative path from the directory of `source` to part `target`.
pub(crate) fn relative_target(source: &str, target: &str) -> String {
    let from: Vec<&str> = match source.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let to: Vec<&str> = target.split('/').collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend_from_slice(&to[common..]);
    parts.join("/")
}

fn is_media(name: &str) -> bool {
    let ext = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    matches!(ext.as_str(), "mp4" | "wav" | "mp3" | "png" | "jpeg" | "jpg")
}

fn parse_rels(name: &str, xml: &str) -> Result<Vec<Relationship>, AvatarDeckError> {
    let doc = XmlDoc::parse(name, xml)?;
    doc.find("Relationship")
        .map(|n| {
            let get = |key: &str| {
                n.attr(key).map(str::to_string).ok_or_else(|| {
                    AvatarDeckError::invalid_deck(name, format!("relationship without {key}"))
                })
            };
            Ok(Relationship {
                id: get("Id")?,
                rel_type: get("Type")?,
                target: get("Target")?,
                external: n.attr("TargetMode") == Some("External"),
            })
        })
        .collect()
}

fn render_rels(rels: &[Relationship]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for r in rels {
        out.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
            escape(&r.id),
            escape(&r.rel_type),
            escape(&r.target),
            if r.external {
                r#" TargetMode="External""#
            } else {
                ""
            }
        ));
    }
    out.push_str("</Relationships>");
    out
}
