//! Pipeline stages for blood test report analysis.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and lets the two text sources share
//! everything up to the body text.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ intake ──▶ extract ──▶ classify ──▶ select ──────────▶ assemble
//! (CLI)    (temp file)  (text)     (markers)  ╰─▶ llm ─▶ postprocess ─╯
//! ```
//!
//! 1. [`input`]    — read a CLI path or download a URL into an upload
//! 2. [`intake`]   — validate the upload and stage it in a self-deleting temp file
//! 3. [`extract`]  — pull the text layer; runs in `spawn_blocking` and never fails
//! 4. [`classify`] — keyword table lookup, text → marker categories
//! 5. [`select`]   — template text source: pick and render canned fragments
//! 6. [`llm`]      — LLM text source: sequential persona tasks with retry/backoff
//! 7. [`postprocess`] — deterministic cleanup of LLM output
//! 8. [`assemble`] — wrap the result into the JSON reply

pub mod assemble;
pub mod classify;
pub mod extract;
pub mod input;
pub mod intake;
pub mod llm;
pub mod postprocess;
pub mod select;
