//! Shape-level edits on slide and notes XML.

use super::xml::{escape, splice, Node, XmlDoc};

pub(crate) const NAMESPACES: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const GROUP_PROPERTIES: &str = concat!(
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    "<p:grpSpPr/>"
);

/// Layout placeholders that are never copied onto a new slide.
const SKIPPED_PLACEHOLDERS: &[&str] = &["dt", "ftr", "sldNum"];

/// Placeholder types that carry a text body.
const TEXT_PLACEHOLDERS: &[&str] = &["title", "ctrTitle", "subTitle", "body", "obj"];

/// A slide whose shape tree holds `shapes` after the group properties.
pub(crate) fn slide_xml(shapes: &[String]) -> String {
    format!(
        "{XML_DECL}<p:sld {NAMESPACES}><p:cSld><p:spTree>{GROUP_PROPERTIES}{}</p:spTree></p:cSld>\
         <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>",
        shapes.concat()
    )
}

/// A notes page with a slide image and an empty body placeholder.
pub(crate) fn notes_slide_xml() -> String {
    format!(
        "{XML_DECL}<p:notes {NAMESPACES}><p:cSld><p:spTree>{GROUP_PROPERTIES}\
         <p:sp><p:nvSpPr><p:cNvPr id=\"2\" name=\"Slide Image Placeholder 1\"/>\
         <p:cNvSpPr><a:spLocks noGrp=\"1\" noRot=\"1\" noChangeAspect=\"1\"/></p:cNvSpPr>\
         <p:nvPr><p:ph type=\"sldImg\"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>\
         <p:sp><p:nvSpPr><p:cNvPr id=\"3\" name=\"Notes Placeholder 2\"/>\
         <p:cNvSpPr><a:spLocks noGrp=\"1\"/></p:cNvSpPr>\
         <p:nvPr><p:ph type=\"body\" idx=\"1\"/></p:nvPr></p:nvSpPr><p:spPr/>\
         <p:txBody><a:bodyPr/><a:lstStyle/><a:p/></p:txBody></p:sp>\
         </p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:notes>"
    )
}

/// A notes master with the two placeholders notes pages inherit from.
pub(crate) fn notes_master_xml() -> String {
    format!(
        "{XML_DECL}<p:notesMaster {NAMESPACES}><p:cSld>\
         <p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>\
         <p:spTree>{GROUP_PROPERTIES}\
         <p:sp><p:nvSpPr><p:cNvPr id=\"2\" name=\"Slide Image Placeholder 1\"/>\
         <p:cNvSpPr><a:spLocks noGrp=\"1\" noRot=\"1\" noChangeAspect=\"1\"/></p:cNvSpPr>\
         <p:nvPr><p:ph type=\"sldImg\" idx=\"2\"/></p:nvPr></p:nvSpPr>\
         <p:spPr><a:xfrm><a:off x=\"685800\" y=\"1143000\"/><a:ext cx=\"5486400\" cy=\"3086100\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom><a:noFill/></p:spPr></p:sp>\
         <p:sp><p:nvSpPr><p:cNvPr id=\"3\" name=\"Notes Placeholder 2\"/>\
         <p:cNvSpPr><a:spLocks noGrp=\"1\"/></p:cNvSpPr>\
         <p:nvPr><p:ph type=\"body\" sz=\"quarter\" idx=\"3\"/></p:nvPr></p:nvSpPr>\
         <p:spPr><a:xfrm><a:off x=\"685800\" y=\"4400550\"/><a:ext cx=\"5486400\" cy=\"3600450\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr>\
         <p:txBody><a:bodyPr/><a:lstStyle/><a:p/></p:txBody></p:sp>\
         </p:spTree></p:cSld>\
         <p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" \
         accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" \
         hlink=\"hlink\" folHlink=\"folHlink\"/>\
         <p:notesStyle><a:lvl1pPr marL=\"0\" algn=\"l\" defTabSz=\"914400\" rtl=\"0\">\
         <a:defRPr sz=\"1200\" kern=\"1200\"><a:solidFill><a:schemeClr val=\"tx1\"/></a:solidFill>\
         <a:latin typeface=\"+mn-lt\"/><a:ea typeface=\"+mn-ea\"/><a:cs typeface=\"+mn-cs\"/></a:defRPr>\
         </a:lvl1pPr></p:notesStyle></p:notesMaster>"
    )
}

/// Id for the next shape added to this tree.
pub(crate) fn next_shape_id(doc: &XmlDoc) -> u32 {
    doc.max_attr("p:cNvPr", "id").unwrap_or(0) + 1
}

/// The `p:ph` element of a shape, when it is a placeholder.
pub(crate) fn placeholder<'a>(doc: &'a XmlDoc, shape: &'a Node) -> Option<&'a Node> {
    let nv = doc.child(shape, "p:nvSpPr")?;
    let nv_pr = doc.child(nv, "p:nvPr")?;
    doc.child(nv_pr, "p:ph")
}

/// Placeholder type, defaulting to `obj` as the schema does.
pub(crate) fn placeholder_type<'a>(ph: &'a Node) -> &'a str {
    ph.attr("type").unwrap_or("obj")
}

/// First shape whose placeholder type is one of `types`.
pub(crate) fn placeholder_of_type<'a>(doc: &'a XmlDoc, types: &[&str]) -> Option<&'a Node> {
    doc.find("p:sp").find(|sp| {
        placeholder(doc, sp).is_some_and(|ph| types.contains(&placeholder_type(ph)))
    })
}

/// Shape whose non-visual properties carry `name`.
pub(crate) fn shape_named<'a>(doc: &'a XmlDoc, name: &str) -> Option<&'a Node> {
    doc.find("p:sp").find(|sp| {
        doc.child(sp, "p:nvSpPr")
            .and_then(|nv| doc.child(nv, "p:cNvPr"))
            .and_then(|c| c.attr("name"))
            == Some(name)
    })
}

/// Names of the shape tree's direct children, back to front.
pub(crate) fn shape_names(doc: &XmlDoc) -> Vec<String> {
    let Some(tree) = doc.first("p:spTree") else {
        return Vec::new();
    };
    doc.children(tree)
        .filter(|n| !matches!(n.name.as_str(), "p:nvGrpSpPr" | "p:grpSpPr" | "p:extLst"))
        .filter_map(|n| {
            doc.descendants(n, "p:cNvPr")
                .next()
                .and_then(|c| c.attr("name"))
                .map(str::to_string)
        })
        .collect()
}

/// Fresh placeholder shapes for every layout placeholder worth inheriting.
///
/// Ids start at `first_id`; names follow the `"{kind} {id - 1}"` convention
/// that authoring tools use, so the first body placeholder after a title is
/// `Content Placeholder 2`.
pub(crate) fn cloned_placeholders(layout: &XmlDoc, first_id: u32) -> Vec<String> {
    let Some(tree) = layout.first("p:spTree") else {
        return Vec::new();
    };
    let mut id = first_id;
    let mut shapes = Vec::new();
    for sp in layout.children(tree).filter(|n| n.name == "p:sp") {
        let Some(ph) = placeholder(layout, sp) else {
            continue;
        };
        let kind = placeholder_type(ph);
        if SKIPPED_PLACEHOLDERS.contains(&kind) {
            continue;
        }
        let text_body = if TEXT_PLACEHOLDERS.contains(&kind) {
            "<p:txBody><a:bodyPr/><a:lstStyle/><a:p/></p:txBody>"
        } else {
            ""
        };
        shapes.push(format!(
            "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"{} {}\"/>\
             <p:cNvSpPr><a:spLocks noGrp=\"1\"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr>\
             <p:spPr/>{text_body}</p:sp>",
            base_name(kind),
            id - 1,
            layout.raw(ph),
        ));
        id += 1;
    }
    shapes
}

fn base_name(kind: &str) -> &'static str {
    match kind {
        "title" | "ctrTitle" => "Title",
        "subTitle" => "Subtitle",
        "body" => "Text Placeholder",
        "chart" => "Chart Placeholder",
        "tbl" => "Table Placeholder",
        "pic" => "Picture Placeholder",
        "clipArt" => "ClipArt Placeholder",
        "dgm" => "Diagram Placeholder",
        "media" => "Media Placeholder",
        "sldImg" => "Slide Image Placeholder",
        _ => "Content Placeholder",
    }
}

/// Text of every paragraph in the shape's text body, one per line.
pub(crate) fn paragraphs_text(doc: &XmlDoc, shape: &Node) -> String {
    let Some(body) = doc.child(shape, "p:txBody") else {
        return String::new();
    };
    doc.children(body)
        .filter(|n| n.name == "a:p")
        .map(|p| doc.text_of(p))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Document text with the shape's paragraphs replaced by `lines`.
///
/// Body properties and list style are kept; a shape without a text body
/// gets one.
pub(crate) fn with_paragraphs<S: AsRef<str>>(doc: &XmlDoc, shape: &Node, lines: &[S]) -> String {
    let paragraphs = render_paragraphs(lines);
    match doc.child(shape, "p:txBody") {
        Some(body) => {
            let keep = |name: &str| {
                doc.child(body, name)
                    .map(|n| doc.raw(n).to_string())
                    .unwrap_or_else(|| format!("<{name}/>"))
            };
            let replacement = format!(
                "<p:txBody>{}{}{paragraphs}</p:txBody>",
                keep("a:bodyPr"),
                keep("a:lstStyle")
            );
            splice(&doc.text, body.start..body.end, &replacement)
        }
        None => {
            let replacement = format!("<p:txBody><a:bodyPr/><a:lstStyle/>{paragraphs}</p:txBody>");
            match shape.append_at() {
                Some(at) => splice(&doc.text, at..at, &replacement),
                None => {
                    let open = doc.raw(shape).trim_end_matches("/>").trim_end().to_string();
                    splice(
                        &doc.text,
                        shape.start..shape.end,
                        &format!("{open}>{replacement}</p:sp>"),
                    )
                }
            }
        }
    }
}

fn render_paragraphs<S: AsRef<str>>(lines: &[S]) -> String {
    if lines.is_empty() {
        return "<a:p/>".to_string();
    }
    lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            if line.is_empty() {
                "<a:p/>".to_string()
            } else {
                format!(
                    "<a:p><a:r><a:rPr lang=\"en-US\" dirty=\"0\"/><a:t>{}</a:t></a:r></a:p>",
                    escape(line)
                )
            }
        })
        .collect()
}
