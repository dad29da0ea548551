use approx::assert_relative_eq;
use lazydsp::filters::{CompiledFilter, FilterState, RationalExpr, parse_expr};
use lazydsp::{Error, Sample, Tolerance, sources};
use proptest::prelude::*;

fn tol() -> Tolerance {
    Tolerance::default().with_epsilon(1e-8)
}

fn coeffs() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-4.0f64..4.0, 1..4)
}

/// Denominators with a lag-0 term bounded away from zero.
fn denominator() -> impl Strategy<Value = Vec<f64>> {
    (0.5f64..3.0, prop::collection::vec(-2.0f64..2.0, 0..3)).prop_map(|(lead, rest)| {
        let mut out = vec![lead];
        out.extend(rest);
        out
    })
}

fn expr() -> impl Strategy<Value = RationalExpr> {
    (coeffs(), denominator())
        .prop_map(|(num, den)| RationalExpr::from_coeffs(num, den).unwrap())
}

fn assert_close(a: &RationalExpr, b: &RationalExpr) -> Result<(), TestCaseError> {
    prop_assert!(a.approx_eq(b, &tol()), "{} != {}", a, b);
    Ok(())
}

proptest! {
    #[test]
    fn addition_is_commutative(a in expr(), b in expr()) {
        assert_close(&(&a + &b), &(&b + &a))?;
    }

    #[test]
    fn multiplication_is_commutative(a in expr(), b in expr()) {
        assert_close(&(&a * &b), &(&b * &a))?;
    }

    #[test]
    fn addition_is_associative(a in expr(), b in expr(), c in expr()) {
        assert_close(&(&(&a + &b) + &c), &(&a + &(&b + &c)))?;
    }

    #[test]
    fn multiplication_is_associative(a in expr(), b in expr(), c in expr()) {
        assert_close(&(&(&a * &b) * &c), &(&a * &(&b * &c)))?;
    }

    #[test]
    fn multiplication_distributes(a in expr(), b in expr(), c in expr()) {
        assert_close(&(&a * &(&b + &c)), &(&(&a * &b) + &(&a * &c)))?;
    }

    #[test]
    fn identities_hold(a in expr()) {
        assert_close(&(&a + &RationalExpr::from(0.0)), &a)?;
        assert_close(&(&a * &RationalExpr::from(1.0)), &a)?;
        prop_assert!((&a - &a).is_zero() || (&a - &a).approx_eq(&RationalExpr::from(0.0), &tol()));
    }

    #[test]
    fn division_undoes_multiplication(a in expr(), b in denominator()) {
        // Every generated denominator is a nonzero expression
        let b = RationalExpr::from_numerator(b);
        let quotient = (&a / &b).unwrap();
        assert_close(&(&quotient * &b), &a)?;
    }

    #[test]
    fn display_parses_back(a in expr()) {
        let parsed = parse_expr(&a.to_string()).unwrap();
        assert_close(&parsed, &a)?;
    }
}

#[test]
fn one_pole_on_five_ones() {
    let filter = RationalExpr::from_coeffs([1.0], [1.0, -0.5])
        .unwrap()
        .compile()
        .unwrap();
    let out = filter.apply(sources::ones().take(5)).drain_real().unwrap();
    let expected = [1.0, 1.5, 1.75, 1.875, 1.9375];
    for (got, want) in out.iter().zip(expected) {
        assert_relative_eq!(*got, want);
    }
    assert_eq!(out.len(), 5);
}

#[test]
fn identity_filter_passes_input_through() {
    let input = vec![0.25, -3.0, 7.5, 0.0, 1e-9];
    let out = CompiledFilter::identity()
        .apply(input.clone())
        .drain_real()
        .unwrap();
    assert_eq!(out, input);

    let also_identity = RationalExpr::from_coeffs([2.0], [2.0])
        .unwrap()
        .compile()
        .unwrap();
    let out = also_identity.apply(input.clone()).drain_real().unwrap();
    assert_eq!(out, input);
}

#[test]
fn improper_denominator_is_rejected() {
    assert!(matches!(
        CompiledFilter::from_coefficients([1.0], [0.0, 1.0]),
        Err(Error::ImproperFilter { .. })
    ));
    assert!(matches!(
        RationalExpr::z().compile(),
        Err(Error::ImproperFilter { .. })
    ));
}

#[test]
fn division_by_zero_expression_is_singular() {
    let d = RationalExpr::delay();
    let zero = &d - &d;
    assert!(zero.is_zero());
    assert_eq!((1.0 / zero).unwrap_err(), Error::SingularExpression);
}

#[test]
fn filters_compose_by_multiplication() {
    let d = RationalExpr::delay();
    let smoother = ((0.5 + 0.5 * d.clone()) * (1 - d.clone())).compile().unwrap();
    let input = vec![1.0, 2.0, 4.0, 8.0, 16.0];

    let combined = smoother.apply(input.clone()).drain_real().unwrap();
    let first = (0.5 + 0.5 * d.clone()).compile().unwrap();
    let second = (1 - d).compile().unwrap();
    let chained = second.apply(first.apply(input)).drain_real().unwrap();

    for (a, b) in combined.iter().zip(&chained) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn initial_state_continues_a_run() {
    let filter = CompiledFilter::from_coefficients([0.3, 0.2], [1.0, -0.6]).unwrap();
    let input: Vec<f64> = (0..10).map(|n| (n as f64 * 0.7).sin()).collect();

    let whole = filter.apply(input.clone()).drain_real().unwrap();

    let (head, tap) = filter
        .apply_tapped(input[..4].to_vec(), FilterState::default())
        .unwrap();
    let head = head.drain_real().unwrap();
    let tail = filter
        .apply_with_state(input[4..].to_vec(), tap.state())
        .unwrap()
        .drain_real()
        .unwrap();

    let resumed: Vec<f64> = head.into_iter().chain(tail).collect();
    for (a, b) in whole.iter().zip(&resumed) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn complex_coefficients_rotate_samples() {
    let rotate = RationalExpr::constant(Sample::new(0.0, 1.0))
        .compile()
        .unwrap();
    let out = rotate.apply(vec![1.0, 2.0]).drain().unwrap();
    assert_eq!(out, vec![Sample::new(0.0, 1.0), Sample::new(0.0, 2.0)]);
}
