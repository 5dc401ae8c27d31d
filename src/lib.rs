//! # flower_cards – printable cards from flower-order form responses
//!
//! A CSV export of the order form goes in; one duplex-ready PDF comes out.
//! The stages are:
//!
//! 1. **Extract** – CSV rows → [`Card`]s, one per filled recipient slot ([`extract`])
//! 2. **Reorder** – swap info cards pairwise for duplex alignment ([`reorder`])
//! 3. **Template** – cards → message / info HTML via handlebars ([`templates`])
//! 4. **Render** – HTML → PDF with the built-in layout engine ([`engine`])
//! 5. **Interleave** – alternate message and info pages ([`interleave`])
//!
//! [`pipeline::CardPipeline`] runs them in order for a [`CardConfig`].

pub mod assets;
pub mod card;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod interleave;
pub mod pipeline;
pub mod reorder;
pub mod templates;

// Re-exports for convenience
pub use card::Card;
pub use config::CardConfig;
pub use engine::{ForgeRenderer, HtmlRenderer, PageSetup};
pub use error::{CardError, Result};
pub use extract::extract_cards;
pub use interleave::{interleave, LopdfMerger, PageMerger};
pub use pipeline::CardPipeline;
pub use reorder::swap_pairs;
