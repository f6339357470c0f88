//! Label Studio ML backends for brush-mask segmentation.
//!
//! Two adapters share one HTTP surface: [`backends::SamBackend`] turns the
//! annotator's clicks and boxes into SAM prompts, and
//! [`backends::ClothingBackend`] labels every garment in an image at once.
//! Both return masks in Label Studio's brush RLE format.

pub mod annotation;
pub mod auth;
pub mod backends;
pub mod config;
pub mod predictor;
pub mod routes;
pub mod startup;
pub mod storage;
