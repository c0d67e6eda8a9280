//! In-memory presentation package and the edits the pipelines make to it.
//!
//! A `.pptx` file is a zip of XML parts tied together by relationship
//! parts. [`Deck`] keeps every part in memory, resolves slides through the
//! presentation's slide list, and writes edits back as text splices on the
//! affected parts (see [`xml`]). Parts the crate never touches round-trip
//! byte for byte.
//!
//! Slide numbers are 1-based throughout, matching what users see in the
//! slide sorter; layout indices are 0-based positions in the first master.

pub mod media;
mod package;
mod shapes;
mod xml;

pub use media::{Layer, MediaKind};

use crate::config::MediaGeometry;
use crate::error::AvatarDeckError;
use package::{
    Package, CT_NOTES_MASTER, CT_NOTES_SLIDE, CT_SLIDE, CT_THEME, RT_IMAGE, RT_MEDIA,
    RT_NOTES_MASTER, RT_NOTES_SLIDE, RT_SLIDE, RT_SLIDE_LAYOUT, RT_THEME,
};
use std::path::{Path, PathBuf};
use tracing::debug;
use xml::{splice, XmlDoc};

/// Zip local-file-header signature every package starts with.
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Smallest id PowerPoint accepts in `p:sldId`.
const MIN_SLIDE_ID: u32 = 256;

/// One entry of the presentation's slide list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideInfo {
    /// 1-based position in the deck.
    pub number: usize,
    /// Persistent slide id from `p:sldId`.
    pub id: u32,
    /// Package part holding the slide.
    pub part: String,
}

/// A presentation loaded into memory.
#[derive(Debug, Clone)]
pub struct Deck {
    package: Package,
    main: String,
}

impl Deck {
    /// Load a presentation file, checking it is a zip package first.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AvatarDeckError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AvatarDeckError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(AvatarDeckError::PermissionDenied {
                    path: path.to_path_buf(),
                });
            }
            Err(_) => {
                return Err(AvatarDeckError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
        };
        if bytes.len() < 4 || &bytes[..4] != ZIP_MAGIC {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            return Err(AvatarDeckError::NotAPresentation {
                path: path.to_path_buf(),
                magic,
            });
        }
        debug!("Opened presentation: {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AvatarDeckError> {
        let package = Package::from_bytes(bytes)?;
        let main = package.main_part()?;
        if !package.contains(&main) {
            return Err(AvatarDeckError::invalid_deck(main, "missing part"));
        }
        Ok(Self { package, main })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, AvatarDeckError> {
        self.package.to_bytes()
    }

    /// Write the presentation to `path` via a temp file and rename, so a
    /// crash never leaves a truncated deck behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AvatarDeckError> {
        let path = path.as_ref();
        let write_failed = |source| AvatarDeckError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        let bytes = self.to_bytes()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        let tmp_path = tmp_path_for(path);
        std::fs::write(&tmp_path, &bytes).map_err(write_failed)?;
        std::fs::rename(&tmp_path, path).map_err(write_failed)?;
        debug!("Saved presentation: {}", path.display());
        Ok(())
    }

    /// Slides in presentation order.
    pub fn slides(&self) -> Result<Vec<SlideInfo>, AvatarDeckError> {
        let doc = self.package.doc(&self.main)?;
        let Some(list) = doc.first("p:sldIdLst") else {
            return Ok(Vec::new());
        };
        doc.children(list)
            .filter(|n| n.name == "p:sldId")
            .enumerate()
            .map(|(i, n)| {
                let id = n
                    .attr("id")
                    .and_then(|v| v.parse::<u32>().ok())
                    .ok_or_else(|| AvatarDeckError::invalid_deck(&self.main, "slide without id"))?;
                let r_id = n.attr("r:id").ok_or_else(|| {
                    AvatarDeckError::invalid_deck(&self.main, "slide without relationship")
                })?;
                Ok(SlideInfo {
                    number: i + 1,
                    id,
                    part: self.package.related_part(&self.main, r_id)?,
                })
            })
            .collect()
    }

    pub fn slide_count(&self) -> Result<usize, AvatarDeckError> {
        Ok(self.slides()?.len())
    }

    /// Slide `number`, or `SlideOutOfRange`.
    pub fn slide(&self, number: usize) -> Result<SlideInfo, AvatarDeckError> {
        let slides = self.slides()?;
        let total = slides.len();
        number
            .checked_sub(1)
            .and_then(|i| slides.into_iter().nth(i))
            .ok_or(AvatarDeckError::SlideOutOfRange {
                slide: number,
                total,
            })
    }

    /// Layout parts of the first slide master, in master order.
    pub fn layouts(&self) -> Result<Vec<String>, AvatarDeckError> {
        let master = self.first_master()?;
        let doc = self.package.doc(&master)?;
        let Some(list) = doc.first("p:sldLayoutIdLst") else {
            return Ok(Vec::new());
        };
        doc.children(list)
            .filter_map(|n| n.attr("r:id"))
            .map(|r_id| self.package.related_part(&master, r_id))
            .collect()
    }

    /// Text of the slide's title placeholder; empty without one.
    pub fn title_text(&self, number: usize) -> Result<String, AvatarDeckError> {
        let slide = self.slide(number)?;
        let doc = self.package.doc(&slide.part)?;
        Ok(shapes::placeholder_of_type(&doc, &["title", "ctrTitle"])
            .map(|title| shapes::paragraphs_text(&doc, title))
            .unwrap_or_default())
    }

    /// Paragraphs of the shape called `name`, joined with `\n`.
    pub fn placeholder_text(&self, number: usize, name: &str) -> Result<String, AvatarDeckError> {
        let slide = self.slide(number)?;
        let doc = self.package.doc(&slide.part)?;
        let shape = shapes::shape_named(&doc, name).ok_or_else(|| {
            AvatarDeckError::PlaceholderNotFound {
                slide: number,
                name: name.to_string(),
            }
        })?;
        Ok(shapes::paragraphs_text(&doc, shape))
    }

    /// Speaker notes of slide `number`; empty when the slide has none.
    pub fn notes_text(&self, number: usize) -> Result<String, AvatarDeckError> {
        let slide = self.slide(number)?;
        let Some(notes) = self.package.related_by_type(&slide.part, RT_NOTES_SLIDE)? else {
            return Ok(String::new());
        };
        let doc = self.package.doc(&notes)?;
        Ok(shapes::placeholder_of_type(&doc, &["body"])
            .map(|body| shapes::paragraphs_text(&doc, body))
            .unwrap_or_default())
    }

    /// Replace the speaker notes of slide `number`, one paragraph per line.
    ///
    /// Creates the notes page, and the notes master if the package has
    /// none, when they are missing.
    pub fn set_notes_text(&mut self, number: usize, text: &str) -> Result<(), AvatarDeckError> {
        let slide = self.slide(number)?;
        let notes = match self.package.related_by_type(&slide.part, RT_NOTES_SLIDE)? {
            Some(part) => part,
            None => self.create_notes_slide(&slide.part)?,
        };
        let doc = self.package.doc(&notes)?;
        let body = shapes::placeholder_of_type(&doc, &["body"]).ok_or_else(|| {
            AvatarDeckError::PlaceholderNotFound {
                slide: number,
                name: "notes body".to_string(),
            }
        })?;
        let lines: Vec<&str> = text.lines().collect();
        let updated = shapes::with_paragraphs(&doc, body, &lines);
        self.package.put(notes, updated);
        Ok(())
    }

    /// Append a slide built from layout `layout_index` of the first master;
    /// returns its slide number.
    ///
    /// The layout's placeholders are copied onto the slide, except the
    /// date, footer and slide-number ones.
    pub fn add_slide(&mut self, layout_index: usize) -> Result<usize, AvatarDeckError> {
        let layouts = self.layouts()?;
        let layout = layouts
            .get(layout_index)
            .ok_or(AvatarDeckError::LayoutOutOfRange {
                index: layout_index,
                total: layouts.len(),
            })?
            .clone();

        let layout_doc = self.package.doc(&layout)?;
        let placeholders = shapes::cloned_placeholders(&layout_doc, 2);

        let part = self.package.next_part_name("ppt/slides/slide", "xml");
        self.package.put(part.clone(), shapes::slide_xml(&placeholders));
        self.package.relate(&part, RT_SLIDE_LAYOUT, &layout)?;
        self.package.add_override_type(&part, CT_SLIDE)?;

        let r_id = self.package.relate(&self.main, RT_SLIDE, &part)?;
        self.append_slide_id(&r_id)?;
        debug!("Added {} from {}", part, layout);
        self.slide_count()
    }

    /// Replace the text of the slide's title placeholder.
    pub fn set_title(&mut self, number: usize, text: &str) -> Result<(), AvatarDeckError> {
        let slide = self.slide(number)?;
        let doc = self.package.doc(&slide.part)?;
        let title = shapes::placeholder_of_type(&doc, &["title", "ctrTitle"]).ok_or_else(|| {
            AvatarDeckError::PlaceholderNotFound {
                slide: number,
                name: "title".to_string(),
            }
        })?;
        let updated = shapes::with_paragraphs(&doc, title, &[text]);
        self.package.put(slide.part, updated);
        Ok(())
    }

    /// Replace the paragraphs of the shape called `name` with `lines`.
    pub fn set_placeholder_paragraphs<S: AsRef<str>>(
        &mut self,
        number: usize,
        name: &str,
        lines: &[S],
    ) -> Result<(), AvatarDeckError> {
        let slide = self.slide(number)?;
        let doc = self.package.doc(&slide.part)?;
        let shape = shapes::shape_named(&doc, name).ok_or_else(|| {
            AvatarDeckError::PlaceholderNotFound {
                slide: number,
                name: name.to_string(),
            }
        })?;
        let updated = shapes::with_paragraphs(&doc, shape, lines);
        self.package.put(slide.part, updated);
        Ok(())
    }

    /// Names of the slide's top-level shapes, back to front.
    pub fn shape_names(&self, number: usize) -> Result<Vec<String>, AvatarDeckError> {
        let slide = self.slide(number)?;
        Ok(shapes::shape_names(&self.package.doc(&slide.part)?))
    }

    /// Embed the media file at `path` on slide `number`; returns the new
    /// shape id. The kind is taken from the file extension.
    pub fn add_media(
        &mut self,
        number: usize,
        path: impl AsRef<Path>,
        geometry: &MediaGeometry,
        layer: Layer,
    ) -> Result<u32, AvatarDeckError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes = std::fs::read(path).map_err(|_| AvatarDeckError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        self.add_media_bytes(number, bytes, &ext, geometry, layer)
    }

    /// Embed in-memory media with extension `ext` on slide `number`.
    ///
    /// Adds the media part, a poster image, the link/embed/image
    /// relationships, the picture element and its playback timing node.
    pub fn add_media_bytes(
        &mut self,
        number: usize,
        bytes: Vec<u8>,
        ext: &str,
        geometry: &MediaGeometry,
        layer: Layer,
    ) -> Result<u32, AvatarDeckError> {
        let (kind, content_type) = MediaKind::from_extension(ext)?;
        let ext = ext.to_ascii_lowercase();
        let slide = self.slide(number)?;

        let media_part = self.package.next_part_name("ppt/media/media", &ext);
        self.package.put(media_part.clone(), bytes);
        self.package.ensure_default_type(&ext, content_type)?;

        let poster_part = self.package.next_part_name("ppt/media/image", "png");
        self.package.put(poster_part.clone(), media::poster_png()?);
        self.package.ensure_default_type("png", "image/png")?;

        let rels = media::MediaRels {
            link: self.package.relate(&slide.part, kind.rel_type(), &media_part)?,
            embed: self.package.relate(&slide.part, RT_MEDIA, &media_part)?,
            poster: self.package.relate(&slide.part, RT_IMAGE, &poster_part)?,
        };

        let doc = self.package.doc(&slide.part)?;
        let id = shapes::next_shape_id(&doc);
        let pic = media::pic_xml(id, &format!("Movie {}", id - 1), kind, &rels, geometry);
        let placed = media::insert_shape(&slide.part, &doc, &pic, layer)?;
        let doc = XmlDoc::parse(&slide.part, &placed)?;
        let timed = media::add_timing(&slide.part, &doc, kind, id)?;
        self.package.put(slide.part.clone(), timed);

        debug!(
            "Embedded {} on slide {} as shape {} ({:?})",
            media_part, number, id, layer
        );
        Ok(id)
    }

    fn first_master(&self) -> Result<String, AvatarDeckError> {
        let doc = self.package.doc(&self.main)?;
        let r_id = doc
            .first("p:sldMasterId")
            .and_then(|n| n.attr("r:id"))
            .ok_or_else(|| AvatarDeckError::invalid_deck(&self.main, "no slide master"))?;
        self.package.related_part(&self.main, r_id)
    }

    fn append_slide_id(&mut self, r_id: &str) -> Result<(), AvatarDeckError> {
        let doc = self.package.doc(&self.main)?;
        let id = doc
            .max_attr("p:sldId", "id")
            .map_or(MIN_SLIDE_ID, |max| (max + 1).max(MIN_SLIDE_ID));
        let entry = format!(r#"<p:sldId id="{id}" r:id="{r_id}"/>"#);

        let updated = match doc.first("p:sldIdLst") {
            Some(list) => match list.append_at() {
                Some(at) => splice(&doc.text, at..at, &entry),
                None => splice(
                    &doc.text,
                    list.start..list.end,
                    &format!("<p:sldIdLst>{entry}</p:sldIdLst>"),
                ),
            },
            None => {
                // the slide list follows the master id lists
                let at = ["p:handoutMasterIdLst", "p:notesMasterIdLst", "p:sldMasterIdLst"]
                    .iter()
                    .find_map(|name| doc.first(name))
                    .map(|n| n.end)
                    .ok_or_else(|| {
                        AvatarDeckError::invalid_deck(&self.main, "no slide master list")
                    })?;
                splice(
                    &doc.text,
                    at..at,
                    &format!("<p:sldIdLst>{entry}</p:sldIdLst>"),
                )
            }
        };
        self.package.put(self.main.clone(), updated);
        Ok(())
    }

    fn create_notes_slide(&mut self, slide_part: &str) -> Result<String, AvatarDeckError> {
        let master = self.ensure_notes_master()?;
        let part = self.package.next_part_name("ppt/notesSlides/notesSlide", "xml");
        self.package.put(part.clone(), shapes::notes_slide_xml());
        self.package.relate(&part, RT_NOTES_MASTER, &master)?;
        self.package.relate(&part, RT_SLIDE, slide_part)?;
        self.package.relate(slide_part, RT_NOTES_SLIDE, &part)?;
        self.package.add_override_type(&part, CT_NOTES_SLIDE)?;
        debug!("Created {} for {}", part, slide_part);
        Ok(part)
    }

    fn ensure_notes_master(&mut self) -> Result<String, AvatarDeckError> {
        if let Some(existing) = self.package.related_by_type(&self.main, RT_NOTES_MASTER)? {
            return Ok(existing);
        }

        // a notes master needs its own theme; copy the slide master's
        let slide_master = self.first_master()?;
        let master_theme = self
            .package
            .related_by_type(&slide_master, RT_THEME)?
            .ok_or_else(|| AvatarDeckError::invalid_deck(&slide_master, "no theme"))?;
        let theme_bytes = self
            .package
            .get(&master_theme)
            .ok_or_else(|| AvatarDeckError::invalid_deck(&master_theme, "missing part"))?
            .to_vec();
        let theme = self.package.next_part_name("ppt/theme/theme", "xml");
        self.package.put(theme.clone(), theme_bytes);
        self.package.add_override_type(&theme, CT_THEME)?;

        let master = self.package.next_part_name("ppt/notesMasters/notesMaster", "xml");
        self.package.put(master.clone(), shapes::notes_master_xml());
        self.package.relate(&master, RT_THEME, &theme)?;
        self.package.add_override_type(&master, CT_NOTES_MASTER)?;

        let r_id = self.package.relate(&self.main, RT_NOTES_MASTER, &master)?;
        let doc = self.package.doc(&self.main)?;
        let after = doc
            .first("p:sldMasterIdLst")
            .map(|n| n.end)
            .ok_or_else(|| AvatarDeckError::invalid_deck(&self.main, "no slide master list"))?;
        let entry = format!(
            r#"<p:notesMasterIdLst><p:notesMasterId r:id="{r_id}"/></p:notesMasterIdLst>"#
        );
        self.package
            .put(self.main.clone(), splice(&doc.text, after..after, &entry));
        debug!("Created {} with theme {}", master, theme);
        Ok(master)
    }
}

/// `deck.pptx` -> `deck.pptx.tmp` in the same directory.
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
pub(crate) mod fixture {
    //! A small but complete presentation built in memory.

    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const NS: &str = super::shapes::NAMESPACES;

    fn layout(name: &str, placeholders: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <p:sldLayout {NS}><p:cSld name=\"{name}\"><p:spTree>\
             <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
             {placeholders}</p:spTree></p:cSld></p:sldLayout>"
        )
    }

    fn ph(id: u32, name: &str, ph: &str) -> String {
        format!(
            "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"{name}\"/><p:cNvSpPr/>\
             <p:nvPr>{ph}</p:nvPr></p:nvSpPr><p:spPr/></p:sp>"
        )
    }

    fn slide(title: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <p:sld {NS}><p:cSld><p:spTree>\
             <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
             <p:sp><p:nvSpPr><p:cNvPr id=\"2\" name=\"Title 1\"/><p:cNvSpPr/><p:nvPr><p:ph type=\"title\"/></p:nvPr></p:nvSpPr>\
             <p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>{title}</a:t></a:r></a:p></p:txBody></p:sp>\
             </p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
        )
    }

    fn notes(text: &str) -> String {
        let paragraphs: String = text
            .split('\n')
            .map(|l| format!("<a:p><a:r><a:t>{l}</a:t></a:r></a:p>"))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <p:notes {NS}><p:cSld><p:spTree>\
             <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
             <p:sp><p:nvSpPr><p:cNvPr id=\"2\" name=\"Slide Image Placeholder 1\"/><p:cNvSpPr/><p:nvPr><p:ph type=\"sldImg\"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>\
             <p:sp><p:nvSpPr><p:cNvPr id=\"3\" name=\"Notes Placeholder 2\"/><p:cNvSpPr/><p:nvPr><p:ph type=\"body\" idx=\"1\"/></p:nvPr></p:nvSpPr>\
             <p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>\
             </p:spTree></p:cSld></p:notes>"
        )
    }

    /// A deck with one slide per entry of `slide_notes`; `None` means the
    /// slide has no notes page. The master has four layouts; the last one
    /// is a title and two content placeholders plus date and slide number.
    pub fn deck_bytes(slide_notes: &[Option<&str>]) -> Vec<u8> {
        let mut parts: Vec<(String, String)> = Vec::new();
        let mut types = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Override PartName=\"/ppt/presentation.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml\"/>",
        );
        let rel = |id: &str, kind: &str, target: &str| {
            format!(
                "<Relationship Id=\"{id}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/{kind}\" Target=\"{target}\"/>"
            )
        };
        let rels_doc = |body: String| {
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
                 <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{body}</Relationships>"
            )
        };

        parts.push((
            "_rels/.rels".into(),
            rels_doc(rel("rId1", "officeDocument", "ppt/presentation.xml")),
        ));

        // master, layouts, theme
        let mut master_rels = String::new();
        let mut layout_ids = String::new();
        let layouts = [
            layout("Title Slide", &ph(2, "Title 1", "<p:ph type=\"ctrTitle\"/>")),
            layout("Title and Content", &ph(2, "Title 1", "<p:ph type=\"title\"/>")),
            layout("Section Header", &ph(2, "Title 1", "<p:ph type=\"title\"/>")),
            layout(
                "Two Content",
                &[
                    ph(2, "Title 1", "<p:ph type=\"title\"/>"),
                    ph(3, "Content Placeholder 2", "<p:ph sz=\"half\" idx=\"1\"/>"),
                    ph(4, "Content Placeholder 3", "<p:ph sz=\"half\" idx=\"2\"/>"),
                    ph(5, "Date Placeholder 4", "<p:ph type=\"dt\" sz=\"half\" idx=\"10\"/>"),
                    ph(6, "Slide Number Placeholder 5", "<p:ph type=\"sldNum\" sz=\"quarter\" idx=\"12\"/>"),
                ]
                .concat(),
            ),
        ];
        for (i, xml) in layouts.into_iter().enumerate() {
            let n = i + 1;
            parts.push((format!("ppt/slideLayouts/slideLayout{n}.xml"), xml));
            parts.push((
                format!("ppt/slideLayouts/_rels/slideLayout{n}.xml.rels"),
                rels_doc(rel("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")),
            ));
            master_rels.push_str(&rel(
                &format!("rId{n}"),
                "slideLayout",
                &format!("../slideLayouts/slideLayout{n}.xml"),
            ));
            layout_ids.push_str(&format!(
                "<p:sldLayoutId id=\"{}\" r:id=\"rId{n}\"/>",
                2147483648u32 + n as u32
            ));
            types.push_str(&format!(
                "<Override PartName=\"/ppt/slideLayouts/slideLayout{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml\"/>"
            ));
        }
        master_rels.push_str(&rel("rId5", "theme", "../theme/theme1.xml"));
        parts.push((
            "ppt/slideMasters/slideMaster1.xml".into(),
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
                 <p:sldMaster {NS}><p:cSld><p:spTree>\
                 <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
                 </p:spTree></p:cSld><p:sldLayoutIdLst>{layout_ids}</p:sldLayoutIdLst></p:sldMaster>"
            ),
        ));
        parts.push((
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            rels_doc(master_rels),
        ));
        parts.push((
            "ppt/theme/theme1.xml".into(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Office Theme\"/>"
                .into(),
        ));
        types.push_str(
            "<Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml\"/>\
             <Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>",
        );

        // slides and optional notes pages; the first one needs a notes master
        let mut pres_rels = rel("rId1", "slideMaster", "slideMasters/slideMaster1.xml");
        let mut slide_ids = String::new();
        let mut notes_master_list = String::new();
        if slide_notes.iter().any(Option::is_some) {
            pres_rels.push_str(&rel("rId2", "notesMaster", "notesMasters/notesMaster1.xml"));
            notes_master_list =
                "<p:notesMasterIdLst><p:notesMasterId r:id=\"rId2\"/></p:notesMasterIdLst>".into();
            parts.push((
                "ppt/notesMasters/notesMaster1.xml".into(),
                super::shapes::notes_master_xml(),
            ));
            types.push_str(
                "<Override PartName=\"/ppt/notesMasters/notesMaster1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml\"/>",
            );
        }
        for (i, note) in slide_notes.iter().enumerate() {
            let n = i + 1;
            let mut slide_rels = rel("rId1", "slideLayout", "../slideLayouts/slideLayout2.xml");
            if let Some(text) = note {
                parts.push((format!("ppt/notesSlides/notesSlide{n}.xml"), notes(text)));
                parts.push((
                    format!("ppt/notesSlides/_rels/notesSlide{n}.xml.rels"),
                    rels_doc(format!(
                        "{}{}",
                        rel("rId1", "notesMaster", "../notesMasters/notesMaster1.xml"),
                        rel("rId2", "slide", &format!("../slides/slide{n}.xml"))
                    )),
                ));
                slide_rels.push_str(&rel(
                    "rId2",
                    "notesSlide",
                    &format!("../notesSlides/notesSlide{n}.xml"),
                ));
                types.push_str(&format!(
                    "<Override PartName=\"/ppt/notesSlides/notesSlide{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml\"/>"
                ));
            }
            parts.push((format!("ppt/slides/slide{n}.xml"), slide(&format!("Slide {n}"))));
            parts.push((
                format!("ppt/slides/_rels/slide{n}.xml.rels"),
                rels_doc(slide_rels),
            ));
            pres_rels.push_str(&rel(
                &format!("rId{}", n + 10),
                "slide",
                &format!("slides/slide{n}.xml"),
            ));
            slide_ids.push_str(&format!(
                "<p:sldId id=\"{}\" r:id=\"rId{}\"/>",
                255 + n,
                n + 10
            ));
            types.push_str(&format!(
                "<Override PartName=\"/ppt/slides/slide{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>"
            ));
        }
        let slide_list = if slide_ids.is_empty() {
            String::new()
        } else {
            format!("<p:sldIdLst>{slide_ids}</p:sldIdLst>")
        };
        parts.push((
            "ppt/presentation.xml".into(),
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
                 <p:presentation {NS}>\
                 <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
                 {notes_master_list}{slide_list}\
                 <p:sldSz cx=\"12192000\" cy=\"6858000\"/><p:notesSz cx=\"6858000\" cy=\"9144000\"/>\
                 </p:presentation>"
            ),
        ));
        parts.push(("ppt/_rels/presentation.xml.rels".into(), rels_doc(pres_rels)));
        types.push_str("</Types>");

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("[Content_Types].xml", FileOptions::default()).unwrap();
        zip.write_all(types.as_bytes()).unwrap();
        for (name, data) in parts {
            zip.start_file(name, FileOptions::default()).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}
