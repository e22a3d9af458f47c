use media_core::tokenizer::{capitalize, normalize_term, split_tags};

#[test]
fn it_normalizes_unicode_and_case() {
    // NFKC folds the fullwidth letters
    assert_eq!(normalize_term("ＦＯＲＥＳＴ"), "forest");
    assert_eq!(normalize_term("Café Nights"), "café nights");
}

#[test]
fn it_strips_separators() {
    assert_eq!(normalize_term("cats/dogs"), "cats dogs");
    assert_eq!(normalize_term("  !!  "), "");
    assert!(!normalize_term("a/b/c").contains('/'));
}

#[test]
fn it_splits_tags() {
    assert_eq!(split_tags("forest, trees,nature , "), vec!["forest", "trees", "nature"]);
    assert!(split_tags("").is_empty());
    assert_eq!(capitalize("forest"), "Forest");
}
