//! avmerge - audio/video merge service
//!
//! Downloads a video and an audio track, muxes them with ffmpeg (video
//! stream copied, audio re-encoded, cut to the shorter input) and hands back
//! a reference to the merged file.

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod media;
pub mod model;
pub mod retention;
pub mod server;
pub mod workflow;
pub mod workspace;
