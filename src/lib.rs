//! subburn - automated subtitle generation
//!
//! Extracts audio from a video, captions it with whisper.cpp, optionally
//! translates each caption line through ollama, and burns the resulting
//! subtitles back into the video with ffmpeg.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod subtitle;
pub mod transcribe;
pub mod transcript;
pub mod translate;
