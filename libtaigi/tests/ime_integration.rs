//! Integration tests for libtaigi IME functionality.
//!
//! Tests the complete IME workflow including:
//! - Engine factories over a compiled dictionary directory
//! - Key scripts on the Standard Bopomofo and Tâi-lô layouts
//! - The keyboardless candidate API (open, walk spans, choose)
//! - Auto-commit and persistence of learned phrases

use libtaigi::{
    compile_source, create_ime_engine, create_ime_engine_for_layout, parse_key_sequence,
    ImeEngine, KeyResult, KeyboardLayout, TaigiConfig,
};
use libtaigi_core::{sequence_from_text, PhraseKind, TaigiError};
use tempfile::TempDir;

const SOURCE: &str = "\
# Standard layout keys: hk4 = ㄘㄜˋ, g4 = ㄕˋ, u6 = ㄧˊ, 1o4 = ㄅㄟˋ, y7 = ㄗ˙
冊     900 ㄘㄜˋ
策     800 ㄘㄜˋ
測     700 ㄘㄜˋ
側     600 ㄘㄜˋ
試     400 ㄕˋ
測試   500 ㄘㄜˋ ㄕˋ
姨     300 ㄧˊ
輩     300 ㄅㄟˋ
子     300 ㄗ˙
一輩   200 ㄧˊ ㄅㄟˋ
一輩子 250 ㄧˊ ㄅㄟˋ ㄗ˙
食     500 tsiah8
飯     300 png7
食飯   80  tsiah8 png7
";

fn dictionary() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    compile_source(SOURCE.as_bytes())
        .unwrap()
        .build()
        .save(dir.path())
        .unwrap();
    dir
}

fn standard(dir: &TempDir) -> ImeEngine {
    create_ime_engine_for_layout(dir.path(), KeyboardLayout::Standard).unwrap()
}

fn type_keys(ime: &mut ImeEngine, script: &str) -> Vec<KeyResult> {
    parse_key_sequence(script)
        .into_iter()
        .map(|key| ime.process_key(key))
        .collect()
}

#[test]
fn test_choose_single_syllable() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    type_keys(&mut ime, "hk4");
    assert_eq!(ime.preedit_string(), "冊");

    ime.cand_open().unwrap();
    assert_eq!(ime.cand_total_choice(), 4);
    assert_eq!(ime.cand_string_by_index(0), Some("冊"));
    assert_eq!(ime.cand_string_by_index(1), Some("策"));
    assert_eq!(ime.cand_string_by_index(2), Some("測"));
    ime.cand_choose_by_index(2).unwrap();
    assert_eq!(ime.preedit_string(), "測");
    assert!(!ime.is_selecting());
}

#[test]
fn test_choose_out_of_range() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    type_keys(&mut ime, "hk4");
    assert!(matches!(
        ime.cand_choose_by_index(0),
        Err(TaigiError::NotSelecting)
    ));
    ime.cand_open().unwrap();
    assert!(matches!(
        ime.cand_choose_by_index(4),
        Err(TaigiError::IndexOutOfRange { index: 4, total: 4 })
    ));
    assert!(ime.is_selecting());
    ime.cand_close().unwrap();
    assert_eq!(ime.preedit_string(), "冊");
}

#[test]
fn test_open_requires_phones() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    type_keys(&mut ime, "hk");
    assert!(ime.cand_open().is_err());
    assert_eq!(ime.bopomofo_string(), "");

    type_keys(&mut ime, "hk4g");
    assert_eq!(ime.bopomofo_string(), "ㄕ");
    ime.cand_open().unwrap();
    assert_eq!(ime.bopomofo_string(), "");
    assert_eq!(ime.cand_string_by_index(0), Some("冊"));
}

#[test]
fn test_rearward_spans() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    ime.config_mut().set_phrase_choice_rearward(true);
    type_keys(&mut ime, "hk4g4");
    assert_eq!(ime.preedit_string(), "測試");

    ime.cand_open().unwrap();
    assert_eq!(ime.cand_string_by_index(0), Some("測試"));
    assert_eq!(ime.context().span, Some((0, 2)));
    assert!(ime.cand_list_has_next());
    ime.cand_list_next().unwrap();
    assert_eq!(ime.cand_string_by_index(0), Some("試"));
    assert_eq!(ime.context().span, Some((1, 2)));
    assert!(!ime.cand_list_has_next());
    assert!(ime.cand_list_next().is_err());

    ime.cand_close().unwrap();
    assert_eq!(ime.cursor(), 2);
}

#[test]
fn test_forward_spans_from_home() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    type_keys(&mut ime, "u61o4y7<H>");
    assert_eq!(ime.preedit_string(), "一輩子");
    assert_eq!(ime.cursor(), 0);

    ime.cand_open().unwrap();
    assert_eq!(ime.cand_string_by_index(0), Some("一輩子"));
    ime.cand_list_next().unwrap();
    assert_eq!(ime.cand_string_by_index(0), Some("一輩"));
    ime.cand_list_last().unwrap();
    assert_eq!(ime.cand_string_by_index(0), Some("姨"));
    assert!(ime.cand_list_has_prev());
    ime.cand_list_first().unwrap();
    assert!(!ime.cand_list_has_prev());
    ime.cand_choose_by_index(0).unwrap();
    assert_eq!(ime.preedit_string(), "一輩子");

    let learned = ime
        .store()
        .lookup(PhraseKind::Word, &sequence_from_text("ㄧˊ ㄅㄟˋ ㄗ˙").unwrap())
        .unwrap();
    assert_eq!(learned.len(), 1);
    assert_eq!(learned[0].phrase, "一輩子");
}

#[test]
fn test_rearward_from_end_pins_span_end() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    ime.config_mut().set_phrase_choice_rearward(true);
    type_keys(&mut ime, "u61o4y7");

    ime.cand_open().unwrap();
    assert_eq!(ime.context().span, Some((0, 3)));
    ime.cand_list_next().unwrap();
    assert_eq!(ime.cand_string_by_index(0), Some("子"));
    assert_eq!(ime.context().span, Some((2, 3)));
    ime.cand_list_prev().unwrap();
    assert_eq!(ime.cand_string_by_index(0), Some("一輩子"));
}

#[test]
fn test_list_ops_need_open_window() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    type_keys(&mut ime, "hk4");
    assert!(ime.cand_list_first().is_err());
    assert!(ime.cand_list_last().is_err());
    assert!(ime.cand_list_next().is_err());
    assert!(ime.cand_list_prev().is_err());
    assert!(!ime.cand_list_has_next());
    assert!(!ime.cand_list_has_prev());
    assert_eq!(ime.cand_total_choice(), 0);
    assert_eq!(ime.cand_string_by_index(0), None);
}

#[test]
fn test_commit_and_clean() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    assert!(ime.commit_preedit().is_err());

    type_keys(&mut ime, "hk4");
    ime.cand_open().unwrap();
    assert!(ime.commit_preedit().is_err());
    assert!(ime.clean_preedit().is_err());
    ime.cand_close().unwrap();

    ime.commit_preedit().unwrap();
    assert_eq!(ime.commit_string(), "冊");
    assert_eq!(ime.preedit_string(), "");

    type_keys(&mut ime, "hk4g");
    ime.clean_bopomofo().unwrap();
    assert_eq!(ime.bopomofo_string(), "");
    ime.clean_bopomofo().unwrap();
    ime.clean_preedit().unwrap();
    assert_eq!(ime.preedit_string(), "");
}

#[test]
fn test_paging() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    ime.config_mut().set_candidates_per_page(3);
    type_keys(&mut ime, "hk4<D>");
    assert!(ime.is_selecting());
    assert_eq!(ime.cand_choice_per_page(), 3);
    assert_eq!(ime.cand_total_page(), 2);
    assert_eq!(ime.context().candidates, vec!["冊", "策", "測"]);

    type_keys(&mut ime, " ");
    assert_eq!(ime.cand_current_page(), 1);
    assert_eq!(ime.context().candidates, vec!["側"]);
    assert_eq!(ime.context().auxiliary_text, "2/2");

    assert_eq!(type_keys(&mut ime, "1"), vec![KeyResult::Absorb]);
    assert_eq!(ime.preedit_string(), "側");
}

#[test]
fn test_auto_commit_at_max_length() {
    let dir = dictionary();
    let mut ime = standard(&dir);
    for _ in 0..39 {
        type_keys(&mut ime, "hk4");
        assert!(!ime.commit_check());
    }
    assert_eq!(ime.composition().len(), 39);
    let results = type_keys(&mut ime, "hk4");
    assert_eq!(results.last(), Some(&KeyResult::Commit));
    assert!(ime.commit_check());
    assert_eq!(ime.commit_string(), "冊");
    assert_eq!(ime.composition().len(), 39);
}

#[test]
fn test_tailo_layout_commit() {
    let dir = dictionary();
    let mut ime = create_ime_engine_for_layout(dir.path(), KeyboardLayout::Tailo).unwrap();
    type_keys(&mut ime, "tsiah8png7");
    assert_eq!(ime.preedit_string(), "食飯");
    assert_eq!(type_keys(&mut ime, "<E>"), vec![KeyResult::Commit]);
    assert_eq!(ime.commit_string(), "食飯");
}

#[test]
fn test_learned_phrases_persist() {
    let dir = dictionary();
    let store = tempfile::tempdir().unwrap();
    let config = TaigiConfig {
        keyboard_layout: KeyboardLayout::Standard,
        data_dir: Some(dir.path().to_path_buf()),
        user_store_path: Some(store.path().join("user.redb")),
        ..Default::default()
    };

    {
        let mut ime = create_ime_engine(&config).unwrap();
        type_keys(&mut ime, "hk4");
        ime.cand_open().unwrap();
        ime.cand_choose_by_index(2).unwrap();
        assert_eq!(type_keys(&mut ime, "<E>"), vec![KeyResult::Commit]);
        assert_eq!(ime.commit_string(), "測");
    }

    let mut ime = create_ime_engine(&config).unwrap();
    assert_eq!(ime.store().lifetime(), 1);
    let learned = ime
        .store()
        .lookup(PhraseKind::Word, &sequence_from_text("ㄘㄜˋ").unwrap())
        .unwrap();
    assert_eq!(learned.len(), 1);
    assert_eq!(learned[0].phrase, "測");
    assert_eq!(learned[0].orig_freq, 700);

    type_keys(&mut ime, "hk4<D>");
    let texts = &ime.context().candidates;
    assert_eq!(texts.iter().filter(|t| t.as_str() == "測").count(), 1);
}
