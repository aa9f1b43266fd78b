//! Document rendering and page-cache engine: decodes document byte
//! buffers, rasterizes pages, extracts positioned text, memoizes render
//! work, and resolves search queries into highlight regions.

pub mod backend;
pub mod config;
pub mod error;
pub mod render;
pub mod search;
