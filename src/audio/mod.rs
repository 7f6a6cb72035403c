//! Audio retrieval for remote media.

mod downloader;

pub use downloader::download_audio;
