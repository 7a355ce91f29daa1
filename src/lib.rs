//! Trustify Analyzer - content-safety orchestration service.
//!
//! Routes text and screenshots through a content-safety vendor (with OCR for
//! images), normalizes the vendor output into a harm verdict, and wraps the
//! backend's Edge Functions for storage, ingest and search.

pub mod config;
pub mod detector;
pub mod functions;
pub mod moderation;
pub mod ocr;
pub mod server;
