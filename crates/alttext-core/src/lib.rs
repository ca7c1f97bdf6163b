//! alttext Core - alt text from third-party computer vision.
//!
//! An uploaded image is sent to Amazon Rekognition, Google Cloud Vision and
//! Azure Computer Vision. Each vendor's labels are summarized into a prompt,
//! and a completion model turns each prompt into alt text.
//!
//! # Architecture
//!
//! ```text
//!                      ┌→ Rekognition → prompt → completion ─┐
//! data URI → ImageInput ┼→ Google      → prompt → completion ─┼→ [GeneratedAltText]
//!                      └→ Azure       → prompt → completion ─┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use alttext_core::{AltTextGenerator, Config, ImageInput};
//!
//! #[tokio::main]
//! async fn main() -> alttext_core::Result<()> {
//!     let config = Config::load()?;
//!     let generator = AltTextGenerator::from_config(&config)?;
//!
//!     let bytes = std::fs::read("./image.jpg")?;
//!     let image = ImageInput::from_bytes(bytes, config.limits.max_upload_mb)?;
//!     for alt in generator.generate(&image).await? {
//!         println!("{}: {}", alt.provider, alt.generated_alt_text);
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod completion;
pub mod config;
pub mod error;
pub mod generator;
pub(crate) mod http;
pub mod prompt;
pub mod retry;
pub mod upload;
pub mod vision;

// Re-exports for convenient access
pub use completion::{CompletionProvider, CompletionProviderFactory};
pub use config::Config;
pub use error::{AltTextError, ConfigError, GenerateError, ImageError, ProviderError, Result};
pub use generator::{AltTextGenerator, GenerateOptions, GeneratedAltText};
pub use prompt::PromptBuilder;
pub use upload::{Compressor, ImageInput};
pub use vision::{ProviderKind, VisionProvider, VisionProviderFactory};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
