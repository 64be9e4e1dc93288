//! Stateless, evidence-based device-type classifier: given the
//! evidence collected so far for one device, decides `Classic`/`Le`/`Dual`/
//! `Unknown` under a strict decision rule, with mode-aware collector gating
//! and a Jaccard-similarity classification cache as a performance hint only.

mod cache;
mod classify;
mod types;

pub use cache::{jaccard_similarity, ClassificationCache};
pub use classify::{classify, is_permitted_in, permitted_modes};
pub use types::{parse_all, Classification, Domain, EvidenceType, Mode, Weight};
