#![cfg(feature = "serde")]

use lazydsp::analysis::{Stability, find_roots};
use lazydsp::filters::{CompiledFilter, FilterState, Polynomial, RationalExpr};
use lazydsp::{Sample, Tolerance};

#[test]
fn test_expression_roundtrip() -> anyhow::Result<()> {
    let expr = RationalExpr::from_coeffs([1.0, -0.5], [1.0, 0.25, -0.125])?;
    let json = serde_json::to_string(&expr)?;
    let back: RationalExpr = serde_json::from_str(&json)?;
    assert_eq!(back, expr);
    Ok(())
}

#[test]
fn test_expression_with_zero_denominator_is_rejected() {
    let json = r#"{"numerator":[[1.0,0.0]],"denominator":[[0.0,0.0]]}"#;
    assert!(serde_json::from_str::<RationalExpr>(json).is_err());
}

#[test]
fn test_filter_roundtrip() -> anyhow::Result<()> {
    let filter = CompiledFilter::from_coefficients([0.5, 0.5], [1.0, -0.2])?;
    let json = serde_json::to_string(&filter)?;
    let back: CompiledFilter = serde_json::from_str(&json)?;
    assert_eq!(back, filter);

    let state = FilterState::new([0.25], [1.0]);
    let back: FilterState = serde_json::from_str(&serde_json::to_string(&state)?)?;
    assert_eq!(back, state);
    Ok(())
}

#[test]
fn test_improper_filter_is_rejected() {
    let json = r#"{"b":[[1.0,0.0]],"a":[[0.0,0.0],[1.0,0.0]]}"#;
    assert!(serde_json::from_str::<CompiledFilter>(json).is_err());
}

#[test]
fn test_analysis_types_roundtrip() -> anyhow::Result<()> {
    let tol = Tolerance::default().with_root_merge(1e-4);
    let back: Tolerance = serde_json::from_str(&serde_json::to_string(&tol)?)?;
    assert_eq!(back, tol);

    let stability: Stability = serde_json::from_str(&serde_json::to_string(&Stability::Unstable)?)?;
    assert_eq!(stability, Stability::Unstable);

    let roots = find_roots(&[Sample::new(1.0, 0.0), Sample::new(-2.0, 0.0)], &tol)?;
    let back: Vec<lazydsp::analysis::Root> = serde_json::from_str(&serde_json::to_string(&roots)?)?;
    assert_eq!(back, roots);

    let poly = Polynomial::new([1.0, 2.0, 3.0]);
    let back: Polynomial = serde_json::from_str(&serde_json::to_string(&poly)?)?;
    assert_eq!(back, poly);
    Ok(())
}
