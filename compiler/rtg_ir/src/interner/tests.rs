use super::*;

#[test]
fn test_intern_is_stable() {
    let interner = StringInterner::new();
    let a = interner.intern("Point");
    let b = interner.intern("Point");
    assert_eq!(a, b);
    assert_eq!(interner.lookup(a), "Point");
}

#[test]
fn test_distinct_strings_get_distinct_names() {
    let interner = StringInterner::new();
    let a = interner.intern("age");
    let b = interner.intern("name");
    assert_ne!(a, b);
}

#[test]
fn test_empty_string_is_pre_interned() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.lookup(Name::EMPTY), "");
}

#[test]
fn test_vocabulary_counts_toward_len() {
    let interner = StringInterner::new();
    let before = interner.len();
    assert!(!interner.is_empty());
    interner.intern("brand_new_identifier");
    assert_eq!(interner.len(), before + 1);
    interner.intern("brand_new_identifier");
    assert_eq!(interner.len(), before + 1);
}

#[test]
fn test_concurrent_interning_agrees() {
    let interner = std::sync::Arc::new(StringInterner::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let interner = std::sync::Arc::clone(&interner);
            std::thread::spawn(move || interner.intern("shared_name"))
        })
        .collect();
    let names: Vec<Name> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(names.windows(2).all(|w| w[0] == w[1]));
}
