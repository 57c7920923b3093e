///  Example#1
/// ```
///    // interpolate a quadratic with a not-a-knot cubic spline
///    use RustedSplines::numerical::interpolation::*;
///    let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
///    let y: Vec<f64> = x.iter().map(|v| v * v).collect();
///    let cs = CubicSpline::new(&x, as_values(&y), 0, BoundaryCondition::NotAKnot, None).unwrap();
///    let v = cs.evaluate(as_values(&[1.5, 2.5]), 0, None);
///    assert!((v[[0]] - 2.25).abs() < 1e-12);
///    // derivative and integral come with every spline
///    let slope = cs.derivative(1).evaluate_flat(&[1.5], 0, None);
///    assert!((slope[[0, 0]] - 3.0).abs() < 1e-12);
///    let area = cs.integrate(0.0, 3.0, None);
///    assert!((area[0] - 9.0).abs() < 1e-12);
/// ```
/// Example#2
/// ```
///    // or the same thing from a task document
///    use RustedSplines::Utils::task_parser::SplineTask;
///    use RustedSplines::numerical::interpolation::*;
///    let task: SplineTask = "spline kind: bspline degree: 5 settings loglevel: off".parse().unwrap();
///    let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
///    let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
///    let spline = task.build(&x, as_values(&y)).unwrap();
///    let v = spline.evaluate_flat(&[4.0], 0, None);
///    assert!((v[[0, 0]] - 4.0_f64.sin()).abs() < 1e-12);
/// ```
pub mod interpolation;
