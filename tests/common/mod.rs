//! Shared fixtures: an in-memory template deck, a module on disk, and
//! scripted avatar, chat and speech services.

#![allow(dead_code)]

use async_trait::async_trait;
use avatar_deck::avatar::{BatchSynthesisRequest, JobStatus, SynthesisJob};
use avatar_deck::{AudioFormat, AvatarApi, AvatarDeckError, Deck, SpeechSynthesizer};
use edgequake_llm::{
    ChatMessage, ChatRole, CompletionOptions, LLMProvider, LLMResponse, LlmError,
};
use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = "xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
                  xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
                  xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\"";
const DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT: &str = "application/vnd.openxmlformats-officedocument";

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!("<Relationship Id=\"{id}\" Type=\"{REL}/{kind}\" Target=\"{target}\"/>")
        })
        .collect();
    format!(
        "{DECL}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{body}</Relationships>"
    )
}

fn placeholder(id: u32, name: &str, ph: &str) -> String {
    format!(
        "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"{name}\"/><p:cNvSpPr/>\
         <p:nvPr>{ph}</p:nvPr></p:nvSpPr><p:spPr/></p:sp>"
    )
}

fn layout(name: &str, shapes: &str) -> String {
    format!(
        "{DECL}<p:sldLayout {NS}><p:cSld name=\"{name}\"><p:spTree>\
         <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
         {shapes}</p:spTree></p:cSld></p:sldLayout>"
    )
}

/// A slide-less template: one master, a "Title Only" layout (index 0) and a
/// "Title and Content" layout (index 1), one theme.
pub fn template_bytes() -> Vec<u8> {
    let parts: Vec<(&str, String)> = vec![
        (
            "[Content_Types].xml",
            format!(
                "{DECL}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
                 <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
                 <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
                 <Override PartName=\"/ppt/presentation.xml\" ContentType=\"{CT}.presentationml.presentation.main+xml\"/>\
                 <Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"{CT}.presentationml.slideMaster+xml\"/>\
                 <Override PartName=\"/ppt/slideLayouts/slideLayout1.xml\" ContentType=\"{CT}.presentationml.slideLayout+xml\"/>\
                 <Override PartName=\"/ppt/slideLayouts/slideLayout2.xml\" ContentType=\"{CT}.presentationml.slideLayout+xml\"/>\
                 <Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"{CT}.theme+xml\"/>\
                 </Types>"
            ),
        ),
        (
            "_rels/.rels",
            rels(&[("rId1", "officeDocument", "ppt/presentation.xml")]),
        ),
        (
            "ppt/presentation.xml",
            format!(
                "{DECL}<p:presentation {NS}>\
                 <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
                 <p:sldSz cx=\"12192000\" cy=\"6858000\"/><p:notesSz cx=\"6858000\" cy=\"9144000\"/>\
                 </p:presentation>"
            ),
        ),
        (
            "ppt/_rels/presentation.xml.rels",
            rels(&[("rId1", "slideMaster", "slideMasters/slideMaster1.xml")]),
        ),
        (
            "ppt/slideMasters/slideMaster1.xml",
            format!(
                "{DECL}<p:sldMaster {NS}><p:cSld><p:spTree>\
                 <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
                 </p:spTree></p:cSld><p:sldLayoutIdLst>\
                 <p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/><p:sldLayoutId id=\"2147483650\" r:id=\"rId2\"/>\
                 </p:sldLayoutIdLst></p:sldMaster>"
            ),
        ),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            rels(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "slideLayout", "../slideLayouts/slideLayout2.xml"),
                ("rId3", "theme", "../theme/theme1.xml"),
            ]),
        ),
        (
            "ppt/slideLayouts/slideLayout1.xml",
            layout("Title Only", &placeholder(2, "Title 1", "<p:ph type=\"title\"/>")),
        ),
        (
            "ppt/slideLayouts/slideLayout2.xml",
            layout(
                "Title and Content",
                &[
                    placeholder(2, "Title 1", "<p:ph type=\"title\"/>"),
                    placeholder(3, "Content Placeholder 2", "<p:ph idx=\"1\"/>"),
                ]
                .concat(),
            ),
        ),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        ),
        (
            "ppt/slideLayouts/_rels/slideLayout2.xml.rels",
            rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        ),
        (
            "ppt/theme/theme1.xml",
            format!(
                "{DECL}<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Office Theme\"/>"
            ),
        ),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in parts {
        zip.start_file(name, FileOptions::default()).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Write a deck with one "Title and Content" slide per entry of `notes`
/// to `dir/lesson.pptx`. An empty string leaves the slide without notes.
pub fn notes_deck(dir: &Path, notes: &[&str]) -> PathBuf {
    let mut deck = Deck::from_bytes(&template_bytes()).unwrap();
    for (i, text) in notes.iter().enumerate() {
        let number = deck.add_slide(1).unwrap();
        deck.set_title(number, &format!("Topic {}", i + 1)).unwrap();
        if !text.is_empty() {
            deck.set_notes_text(number, text).unwrap();
        }
    }
    let path = dir.join("lesson.pptx");
    deck.save(&path).unwrap();
    path
}

/// Write a module to `dir`: the template, `includes/content.md` holding
/// `markdown`, and a manifest named `manifest_name` pointing at it.
/// Returns `(manifest, template)`.
pub fn write_module(dir: &Path, manifest_name: &str, markdown: &str) -> (PathBuf, PathBuf) {
    let template = dir.join("template.pptx");
    std::fs::write(&template, template_bytes()).unwrap();
    std::fs::create_dir_all(dir.join("includes")).unwrap();
    std::fs::write(dir.join("includes/content.md"), markdown).unwrap();
    let manifest = dir.join(manifest_name);
    std::fs::write(
        &manifest,
        "uid: learn.storage.tiers\n\
         title: Storage Tiers\n\
         content: |\n  [!include[](includes/content.md)]\n",
    )
    .unwrap();
    (manifest, template)
}

/// Plays every job through `script`, then records each call it receives.
///
/// A job whose text contains `fail_marker` ends in `Failed` instead of
/// `Succeeded`. The first `transient_errors` status requests fail with a
/// transport error.
pub struct StubAvatarService {
    script: Vec<JobStatus>,
    jobs: Mutex<HashMap<String, (String, VecDeque<JobStatus>)>>,
    log: Mutex<Vec<String>>,
    fail_marker: Option<String>,
    transient_errors: AtomicUsize,
}

impl StubAvatarService {
    pub fn new(script: Vec<JobStatus>) -> Self {
        Self {
            script,
            jobs: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            fail_marker: None,
            transient_errors: AtomicUsize::new(0),
        }
    }

    /// Running twice, then Succeeded.
    pub fn typical() -> Self {
        Self::new(vec![
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Succeeded,
        ])
    }

    pub fn failing_when(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn with_transient_errors(self, n: usize) -> Self {
        self.transient_errors.store(n, Ordering::SeqCst);
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.log().iter().filter(|l| l.starts_with(prefix)).count()
    }
}

#[async_trait]
impl AvatarApi for StubAvatarService {
    async fn create_job(
        &self,
        job_id: &str,
        request: &BatchSynthesisRequest,
    ) -> Result<SynthesisJob, AvatarDeckError> {
        let text = request.inputs[0].content.clone();
        self.log.lock().unwrap().push(format!("create:{text}"));
        self.jobs
            .lock()
            .unwrap()
            .insert(job_id.to_string(), (text, self.script.clone().into()));
        Ok(SynthesisJob::new(job_id, JobStatus::NotStarted))
    }

    async fn get_job(&self, job_id: &str) -> Result<SynthesisJob, AvatarDeckError> {
        if self
            .transient_errors
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            self.log.lock().unwrap().push("get:error".to_string());
            return Err(AvatarDeckError::Transport {
                url: format!("https://stub/{job_id}"),
                reason: "connection reset".into(),
            });
        }

        let mut jobs = self.jobs.lock().unwrap();
        let (text, statuses) = jobs
            .get_mut(job_id)
            .ok_or_else(|| AvatarDeckError::Internal(format!("unknown job {job_id}")))?;
        let mut status = statuses.pop_front().unwrap_or(JobStatus::Running);
        if status == JobStatus::Succeeded
            && self.fail_marker.as_ref().is_some_and(|m| text.contains(m))
        {
            status = JobStatus::Failed;
        }
        self.log.lock().unwrap().push(format!("get:{status}"));

        let job = SynthesisJob::new(job_id, status.clone());
        Ok(if status == JobStatus::Succeeded {
            job.with_outputs(
                format!("https://blob/{job_id}/video.mp4"),
                Some(format!("https://blob/{job_id}/video.srt")),
            )
        } else {
            job
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AvatarDeckError> {
        self.log.lock().unwrap().push(format!("download:{url}"));
        Ok(if url.ends_with(".srt") {
            b"1\n00:00:00,000 --> 00:00:01,500\nHello\n".to_vec()
        } else {
            b"fake-mp4".to_vec()
        })
    }
}

/// Answers chat requests by system prompt: a bullet list when asked for
/// bullets, a one-line transcript otherwise.
///
/// Both echo the last line of the user message. A request whose user
/// message contains `fail_marker` fails with an API error.
pub struct StubChatProvider {
    system_prompts: Mutex<Vec<String>>,
    fail_marker: Option<String>,
}

impl StubChatProvider {
    pub fn new() -> Self {
        Self {
            system_prompts: Mutex::new(Vec::new()),
            fail_marker: None,
        }
    }

    pub fn failing_when(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn system_prompts(&self) -> Vec<String> {
        self.system_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for StubChatProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-chat"
    }

    fn max_context_length(&self) -> usize {
        128_000
    }

    async fn complete(&self, prompt: &str) -> edgequake_llm::Result<LLMResponse> {
        Ok(LLMResponse::new(prompt, "stub-chat"))
    }

    async fn complete_with_options(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.complete(prompt).await
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: Option<&CompletionOptions>,
    ) -> edgequake_llm::Result<LLMResponse> {
        let content_of = |role: ChatRole| {
            messages
                .iter()
                .rev()
                .find(|m| m.role == role)
                .map(|m| m.content.clone())
                .unwrap_or_default()
        };
        let system = content_of(ChatRole::System);
        let user = content_of(ChatRole::User);
        self.system_prompts.lock().unwrap().push(system.clone());

        if self.fail_marker.as_ref().is_some_and(|m| user.contains(m)) {
            return Err(LlmError::ApiError("model overloaded".into()));
        }
        let topic = user.lines().last().unwrap_or_default().trim().to_string();
        let text = if system.starts_with("Create a list of bullet points") {
            format!("- {topic}\n- Key point")
        } else {
            format!("Narration about {topic}.")
        };

        let mut response = LLMResponse::new(text, "stub-chat");
        response.prompt_tokens = 12;
        response.completion_tokens = 4;
        response.total_tokens = 16;
        Ok(response)
    }
}

/// Returns fixed audio bytes and records the format of every request. The
/// first `unavailable` requests fail with a 503.
pub struct StubSpeech {
    formats: Mutex<Vec<AudioFormat>>,
    texts: Mutex<Vec<String>>,
    unavailable: AtomicUsize,
}

impl StubSpeech {
    pub fn new() -> Self {
        Self {
            formats: Mutex::new(Vec::new()),
            texts: Mutex::new(Vec::new()),
            unavailable: AtomicUsize::new(0),
        }
    }

    pub fn unavailable_for(self, n: usize) -> Self {
        self.unavailable.store(n, Ordering::SeqCst);
        self
    }

    pub fn formats(&self) -> Vec<AudioFormat> {
        self.formats.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSpeech {
    async fn synthesize(
        &self,
        text: &str,
        _voice: &str,
        format: AudioFormat,
    ) -> Result<Vec<u8>, AvatarDeckError> {
        self.formats.lock().unwrap().push(format);
        self.texts.lock().unwrap().push(text.to_string());
        if self
            .unavailable
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AvatarDeckError::SpeechFailed {
                status: 503,
                detail: "service unavailable".into(),
            });
        }
        Ok(b"fake-audio".to_vec())
    }
}
