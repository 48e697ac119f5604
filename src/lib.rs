//! GBacquire - GB national standard document acquisition tool.
//!
//! Scrapes the national standards listing portal, negotiates the
//! captcha-protected download flow on the file host, and streams the
//! resulting documents to disk.

pub mod captcha;
pub mod cli;
pub mod config;
pub mod ocr;
pub mod prompt;
pub mod scrapers;
pub mod services;
