//! Embedded video and audio: picture element, playback timing, poster frame.

use super::package::{RT_AUDIO, RT_VIDEO};
use super::xml::{escape, splice, XmlDoc};
use crate::config::MediaGeometry;
use crate::error::AvatarDeckError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// 1×1 transparent PNG shown before playback starts.
const POSTER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAAC0lEQVR4nGNgAAIAAAUAAXpeqz8AAAAASUVORK5CYII=";

/// Extension list entry PowerPoint 2010+ uses for embedded media.
const MEDIA_EXT_URI: &str = "{DAA4B4D4-6D71-4841-9C94-3DE7FCFB9230}";

/// What kind of clip a media file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Kind and MIME type for a file extension.
    pub fn from_extension(ext: &str) -> Result<(Self, &'static str), AvatarDeckError> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Ok((MediaKind::Video, "video/mp4")),
            "wav" => Ok((MediaKind::Audio, "audio/wav")),
            "mp3" => Ok((MediaKind::Audio, "audio/mpeg")),
            other => Err(AvatarDeckError::InvalidConfig(format!(
                "unsupported media type '.{other}' (expected .mp4, .wav or .mp3)"
            ))),
        }
    }

    pub(crate) fn rel_type(self) -> &'static str {
        match self {
            MediaKind::Video => RT_VIDEO,
            MediaKind::Audio => RT_AUDIO,
        }
    }

    fn file_element(self) -> &'static str {
        match self {
            MediaKind::Video => "a:videoFile",
            MediaKind::Audio => "a:audioFile",
        }
    }

    fn timing_element(self) -> &'static str {
        match self {
            MediaKind::Video => "p:video",
            MediaKind::Audio => "p:audio",
        }
    }
}

/// Z-order placement of a new shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layer {
    /// Behind every existing shape.
    Background,
    /// On top of every existing shape.
    #[default]
    Foreground,
}

/// Relationship ids a media picture points at.
pub(crate) struct MediaRels {
    pub link: String,
    pub embed: String,
    pub poster: String,
}

pub(crate) fn poster_png() -> Result<Vec<u8>, AvatarDeckError> {
    STANDARD
        .decode(POSTER_PNG)
        .map_err(|e| AvatarDeckError::Internal(format!("poster image: {e}")))
}

/// The `p:pic` element for a media clip.
pub(crate) fn pic_xml(
    id: u32,
    name: &str,
    kind: MediaKind,
    rels: &MediaRels,
    geometry: &MediaGeometry,
) -> String {
    format!(
        "<p:pic><p:nvPicPr><p:cNvPr id=\"{id}\" name=\"{name}\">\
         <a:hlinkClick r:id=\"\" action=\"ppaction://media\"/></p:cNvPr>\
         <p:cNvPicPr><a:picLocks noChangeAspect=\"1\"/></p:cNvPicPr>\
         <p:nvPr><{file} r:link=\"{link}\"/><p:extLst><p:ext uri=\"{MEDIA_EXT_URI}\">\
         <p14:media xmlns:p14=\"http://schemas.microsoft.com/office/powerpoint/2010/main\" r:embed=\"{embed}\"/>\
         </p:ext></p:extLst></p:nvPr></p:nvPicPr>\
         <p:blipFill><a:blip r:embed=\"{poster}\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>\
         <p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr></p:pic>",
        name = escape(name),
        file = kind.file_element(),
        link = rels.link,
        embed = rels.embed,
        poster = rels.poster,
        x = geometry.left,
        y = geometry.top,
        cx = geometry.width,
        cy = geometry.height,
    )
}

/// Slide text with `shape` inserted into the shape tree at `layer`.
///
/// The background slot is directly after the group properties, which puts
/// the shape at child index 2 of a well-formed tree.
pub(crate) fn insert_shape(
    part: &str,
    doc: &XmlDoc,
    shape: &str,
    layer: Layer,
) -> Result<String, AvatarDeckError> {
    let tree = doc
        .first("p:spTree")
        .ok_or_else(|| AvatarDeckError::invalid_deck(part, "no shape tree"))?;
    let end = tree
        .append_at()
        .ok_or_else(|| AvatarDeckError::invalid_deck(part, "empty shape tree element"))?;

    let at = match layer {
        Layer::Foreground => end,
        Layer::Background => doc
            .child(tree, "p:grpSpPr")
            .or_else(|| doc.child(tree, "p:nvGrpSpPr"))
            .map(|n| n.end)
            .unwrap_or_else(|| tree.inner.as_ref().map_or(end, |r| r.start)),
    };
    Ok(splice(&doc.text, at..at, shape))
}

/// Slide text with a playback node for shape `shape_id` in its timing tree.
pub(crate) fn add_timing(
    part: &str,
    doc: &XmlDoc,
    kind: MediaKind,
    shape_id: u32,
) -> Result<String, AvatarDeckError> {
    let root = doc
        .nodes
        .first()
        .ok_or_else(|| AvatarDeckError::invalid_deck(part, "empty document"))?;
    let next_ctn = doc.max_attr("p:cTn", "id").unwrap_or(0) + 1;

    let Some(timing) = doc.child(root, "p:timing") else {
        let node = media_node(kind, next_ctn + 1, shape_id);
        let timing = format!(
            "<p:timing><p:tnLst><p:par>\
             <p:cTn id=\"{next_ctn}\" dur=\"indefinite\" restart=\"never\" nodeType=\"tmRoot\">\
             <p:childTnLst>{node}</p:childTnLst></p:cTn></p:par></p:tnLst></p:timing>"
        );
        // timing precedes the slide's extension list
        let at = match doc.child(root, "p:extLst") {
            Some(ext) => ext.start,
            None => root
                .append_at()
                .ok_or_else(|| AvatarDeckError::invalid_deck(part, "empty slide element"))?,
        };
        return Ok(splice(&doc.text, at..at, &timing));
    };

    let node = media_node(kind, next_ctn, shape_id);
    let tm_root = doc
        .descendants(timing, "p:cTn")
        .find(|n| n.attr("nodeType") == Some("tmRoot"))
        .ok_or_else(|| AvatarDeckError::invalid_deck(part, "timing tree without a root node"))?;

    Ok(match doc.child(tm_root, "p:childTnLst") {
        Some(list) => match list.append_at() {
            Some(at) => splice(&doc.text, at..at, &node),
            None => splice(
                &doc.text,
                list.start..list.end,
                &format!("<p:childTnLst>{node}</p:childTnLst>"),
            ),
        },
        None => {
            let at = tm_root
                .append_at()
                .ok_or_else(|| AvatarDeckError::invalid_deck(part, "empty timing root"))?;
            splice(
                &doc.text,
                at..at,
                &format!("<p:childTnLst>{node}</p:childTnLst>"),
            )
        }
    })
}

fn media_node(kind: MediaKind, ctn_id: u32, shape_id: u32) -> String {
    let el = kind.timing_element();
    format!(
        "<{el}><p:cMediaNode vol=\"80000\">\
         <p:cTn id=\"{ctn_id}\" fill=\"hold\" display=\"0\">\
         <p:stCondLst><p:cond delay=\"indefinite\"/></p:stCondLst></p:cTn>\
         <p:tgtEl><p:spTgt spid=\"{shape_id}\"/></p:tgtEl></p:cMediaNode></{el}>"
    )
}
