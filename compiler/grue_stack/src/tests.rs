use super::*;

fn nest(depth: u32) -> u32 {
    ensure_sufficient_stack(|| if depth == 0 { 0 } else { nest(depth - 1) + 1 })
}

#[test]
fn shallow_nesting_returns_value() {
    assert_eq!(nest(16), 16);
}

#[test]
fn deep_nesting_does_not_overflow() {
    // Deeper than an 8MB main-thread stack allows without growth.
    assert_eq!(nest(200_000), 200_000);
}

#[test]
fn result_passes_through() {
    let result: Result<u8, String> = ensure_sufficient_stack(|| Err("bad token".to_string()));
    assert_eq!(result, Err("bad token".to_string()));
}
