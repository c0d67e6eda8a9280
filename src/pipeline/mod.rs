//! Pipeline stages for turning source text into slide content.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! manifest ──▶ segment ──▶ llm ──▶ speech / avatar ──▶ deck
//! (YAML)       (sections)  (text)  (audio / video)     (pptx)
//! ```
//!
//! 1. [`manifest`] — read the module YAML and resolve its markdown include
//! 2. [`segment`]  — split markdown into titled sections, one per slide
//! 3. [`llm`]      — bullets and speaker narration via the chat model
//! 4. [`speech`]   — narration to audio; avatar video lives in [`crate::avatar`]

pub mod llm;
pub mod manifest;
pub mod segment;
pub mod speech;
