//! IcoSmith - Multi-resolution ICO generation
//!
//! Turns one source image (PNG, JPEG, GIF, BMP, TIFF, ICO, WebP or SVG) into
//! a Windows ICO container holding one PNG-compressed entry per requested
//! size, with filters that keep 16-48 px icons legible.
//!
//! ```no_run
//! use icosmith::{ConversionRequest, Converter, RenderOptions};
//!
//! let bytes = std::fs::read("logo.svg")?;
//! let request = ConversionRequest::new(bytes, vec![16, 32, 48, 256]).with_options(RenderOptions {
//!     auto_profile: true,
//!     ..RenderOptions::default()
//! });
//! let output = Converter::new().convert(&request, |p| println!("{}% {}", p.percent, p.step))?;
//! std::fs::write("logo.ico", &output.ico)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod converter;
pub mod ico;
pub mod image_processor;
pub mod utils;

pub use converter::limits::ConversionLimits;
pub use converter::options::{RenderOptions, Rgb};
pub use converter::progress::ProgressUpdate;
pub use converter::request::{ConversionOutput, ConversionRequest, DEFAULT_SIZES};
pub use converter::state::ConversionState;
pub use converter::worker::{ConversionTask, WorkerEvent};
pub use converter::Converter;
pub use ico::{encode_ico, IconDirectory};
pub use image_processor::hint::SmallIconHint;
pub use image_processor::render::SizedBitmap;
pub use utils::error::{ErrorKind, IcoError, LimitKind, Result};

/// Install a `tracing` subscriber that honours `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
