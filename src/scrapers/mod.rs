//! Yahoo! News scrapers.
//!
//! Scraping follows the usual two phases:
//!
//! 1. **Indexing** ([`listing`]): expand the category page and collect
//!    article URLs
//! 2. **Fetching** ([`article`]): render each article and read its metadata
//!    and body
//!
//! | Module | Reads |
//! |--------|-------|
//! | [`listing`] | `a[href^=".../articles/"]` after pressing "もっと見る" |
//! | [`article`] | `og:title`, author/publisher meta or JSON-LD, `<time>` |
//! | [`genre`] | `window.__PRELOADED_STATE__` category fields |
//! | [`body`] | `<article>` / `.articleBody` paragraphs over `?page=N` views |
//!
//! All of them read the serialized DOM from a [`crate::render::RenderSession`]
//! and parse it with `scraper`. Missing markup is defaulted, never fatal.

pub mod article;
pub mod body;
pub mod genre;
pub mod listing;
