//! Engine factories for libtaigi
//!
//! These open the static dictionary pair and the user phrase store named by
//! a `TaigiConfig` and hand back a ready `ImeEngine`.

use std::path::Path;
use std::sync::Arc;

use libtaigi_core::{
    ImeEngine, KeyboardLayout, PhraseTree, Result, TaigiError, UserPhraseStore,
};
use tracing::info;

use crate::config::TaigiConfig;

/// Open the user store at `path`, or an in-memory one when `path` is `None`.
pub fn open_user_store(path: Option<&Path>) -> Result<UserPhraseStore> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let store = UserPhraseStore::open(path)?;
            info!(path = %path.display(), lifetime = store.lifetime(), "opened user phrase store");
            Ok(store)
        }
        None => Ok(UserPhraseStore::new_in_memory()),
    }
}

/// Build an engine from a full configuration. `data_dir` must be set.
pub fn create_ime_engine(config: &TaigiConfig) -> Result<ImeEngine> {
    let data_dir = config
        .data_dir
        .as_deref()
        .ok_or_else(|| TaigiError::InvalidConfig("data_dir is not set".to_string()))?;
    let tree = PhraseTree::open(data_dir)?;
    info!(
        dir = %data_dir.display(),
        nodes = tree.node_count(),
        layout = %config.keyboard_layout,
        "loaded dictionary"
    );
    let store = open_user_store(config.user_store_path.as_deref())?;
    Ok(ImeEngine::new(
        Arc::new(tree),
        store,
        config.base.clone(),
        config.keyboard_layout,
    ))
}

/// Engine over the dictionary in `data_dir` with default options and an
/// in-memory user store.
pub fn create_ime_engine_for_layout<P: AsRef<Path>>(
    data_dir: P,
    layout: KeyboardLayout,
) -> Result<ImeEngine> {
    let config = TaigiConfig {
        keyboard_layout: layout,
        data_dir: Some(data_dir.as_ref().to_path_buf()),
        ..Default::default()
    };
    create_ime_engine(&config)
}
