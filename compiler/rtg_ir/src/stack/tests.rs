use super::*;

#[test]
fn test_deeply_nested_recursion() {
    fn nest(depth: u32) -> u32 {
        ensure_sufficient_stack(|| if depth == 0 { 0 } else { nest(depth - 1) + 1 })
    }

    assert_eq!(nest(50_000), 50_000);
}

#[test]
fn test_passes_results_through() {
    let result: Result<u8, &str> = ensure_sufficient_stack(|| Err("mismatch"));
    assert_eq!(result, Err("mismatch"));
}
