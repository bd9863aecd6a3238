use quad_core::expression::ExpressionIntegrand;
use quad_core::{
    integrate, left_riemann, right_riemann, simpson, trapezoidal, InvalidInputError, Partition,
    Rule,
};
use std::f64::consts::FRAC_PI_2;

fn sine_error(rule: Rule, intervals: usize) -> f64 {
    let h = Partition::uniform(-FRAC_PI_2, FRAC_PI_2, intervals).expect("uniform partition");
    rule.integrate(&|x: f64| x.sin(), &h)
        .expect("rule should apply")
        .abs()
}

#[test]
fn sine_over_symmetric_interval_converges_to_zero() {
    for rule in Rule::ALL {
        let errors: Vec<f64> = [4, 16, 64, 256].iter().map(|&n| sine_error(rule, n)).collect();
        let last = errors[errors.len() - 1];
        assert!(last < 1e-2, "{rule}: error {last} at n = 256");
        assert!(last <= errors[0] + 1e-15, "{rule}: errors {errors:?}");
    }
    // Symmetry cancels the trapezoid and Simpson sums; only the Riemann sums
    // carry an O(1/n) endpoint term.
    assert!(sine_error(Rule::Simpson, 256) <= sine_error(Rule::LeftRiemann, 256));
    assert!(sine_error(Rule::Trapezoidal, 256) <= sine_error(Rule::RightRiemann, 256));
}

#[test]
fn constant_integrand_is_exact_on_any_partition() {
    let h = Partition::new(vec![-2.0, -1.5, 0.0, 0.1, 3.0]).expect("valid partition");
    let f = |_x: f64| -4.0;
    let expected = -4.0 * 5.0;
    assert!((left_riemann(&f, &h) - expected).abs() < 1e-12);
    assert!((right_riemann(&f, &h) - expected).abs() < 1e-12);
    assert!((trapezoidal(&f, &h) - expected).abs() < 1e-12);

    let h = Partition::uniform(-2.0, 3.0, 6).expect("uniform partition");
    let value = simpson(&f, &h).expect("even partition");
    assert!((value - expected).abs() < 1e-12);
}

#[test]
fn expression_integrands_plug_into_every_rule() {
    let f: ExpressionIntegrand<f64> = ExpressionIntegrand::compile("x^2", "x", &[], vec![]).expect("expression compiles");
    let h = Partition::uniform(0.0, 1.0, 20).expect("uniform partition");
    let value = Rule::Simpson.integrate(&f, &h).expect("even partition");
    assert!((value - 1.0 / 3.0).abs() < 1e-14);

    let value = Rule::Trapezoidal
        .integrate(&f, &h)
        .expect("trapezoid applies");
    assert!((value - 1.0 / 3.0).abs() < 1e-3);
}

#[test]
fn even_length_partition_fails_for_simpson() {
    let points = [0.0, 0.25, 0.5, 0.75];
    let err = integrate(Rule::Simpson, &|x: f64| x, &points).expect_err("must not return a number");
    assert_eq!(err, InvalidInputError::OddIntervalCount { intervals: 3 });
}

#[test]
fn degenerate_partitions_fail_for_every_rule() {
    for rule in Rule::ALL {
        assert_eq!(
            integrate(rule, &|x: f64| x, &[1.0]).unwrap_err(),
            InvalidInputError::TooFewPoints { len: 1 }
        );
        assert_eq!(
            integrate(rule, &|x: f64| x, &[0.0, 2.0, 1.0]).unwrap_err(),
            InvalidInputError::NotIncreasing { index: 2 }
        );
    }
}
