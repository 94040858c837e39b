//! # libtaigi
//!
//! Taiwanese input method engine (Tâi-lô and Bopomofo layouts) built on
//! libtaigi-core.

pub mod config;
pub mod parser;
pub mod engine;
pub mod presets;

// Re-export IME components from core
pub use libtaigi_core::{
    Candidate, Config, ImeContext, ImeEngine, KeyEvent, KeyResult, KeyboardLayout, PhraseTree,
    TaigiError, TreeBuilder, UserPhraseStore,
};

pub use config::TaigiConfig;
pub use parser::{compile_source, SourceEntry, SourceParser};
pub use engine::{create_ime_engine, create_ime_engine_for_layout, open_user_store};
pub use presets::{layout_from_name, parse_key_sequence};
