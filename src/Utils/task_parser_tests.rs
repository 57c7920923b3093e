/////////////////////////////TESTS////////////////////////////////////////////////////
/*
spline task documents:
full document with every key
defaults for missing keys
boundary conditions with and without slopes
invalid names, counts and combinations
building splines from a task
reading a task from a file
*/

#[cfg(test)]
mod tests2 {
    use crate::Utils::task_parser::SplineTask;
    use crate::numerical::interpolation::batch::as_values;
    use crate::numerical::interpolation::cubic_spline::BoundaryCondition;
    use crate::numerical::interpolation::errors::SplineError;
    use crate::numerical::interpolation::ppoly::Extrapolate;
    use crate::numerical::interpolation::settings::SplineSettings;
    use crate::numerical::interpolation::spline_enum::{SplineKind, SplineOps};
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_full_document() {
        let doc = "
            spline
            kind: cubic
            boundary: clamped, 0.5, -1
            extrapolate: false
            axis: 1
            settings
            loglevel: debug
            periodic_tolerance: 1e-12
            pivot_tolerance: 1e-14
            condition_threshold: 1e10
        ";
        let task: SplineTask = doc.parse().unwrap();
        assert_eq!(
            task.kind,
            SplineKind::Cubic(BoundaryCondition::Clamped { left: 0.5, right: -1.0 })
        );
        assert_eq!(task.extrapolate, Some(Extrapolate::Bool(false)));
        assert_eq!(task.axis, 1);
        assert_eq!(task.loglevel.as_deref(), Some("debug"));
        assert_eq!(task.logfile, None);
        assert_eq!(task.settings.periodic_rtol, 1e-12);
        assert_eq!(task.settings.periodic_atol, 1e-12);
        assert_eq!(task.settings.pivot_rtol, 1e-14);
        assert_eq!(task.settings.condition_threshold, 1e10);
    }

    #[test]
    fn test_defaults() {
        let task: SplineTask = "spline kind: pchip".parse().unwrap();
        assert_eq!(task.kind, SplineKind::Pchip);
        assert_eq!(task.extrapolate, None);
        assert_eq!(task.axis, 0);
        assert_eq!(task.settings, SplineSettings::default());
        let task: SplineTask = "settings loglevel: off".parse().unwrap();
        assert_eq!(task.kind, SplineKind::Cubic(BoundaryCondition::NotAKnot));
        let task: SplineTask = "spline kind: bspline".parse().unwrap();
        assert_eq!(task.kind, SplineKind::Interpolating { degree: 3 });
        let task: SplineTask = "spline kind: bspline degree: 5 extrapolate: periodic".parse().unwrap();
        assert_eq!(task.kind, SplineKind::Interpolating { degree: 5 });
        assert_eq!(task.extrapolate, Some(Extrapolate::Periodic));
    }

    #[test]
    fn test_boundary_conditions() {
        let cases = [
            ("not_a_knot", BoundaryCondition::NotAKnot),
            ("natural", BoundaryCondition::Natural),
            ("periodic", BoundaryCondition::Periodic),
            ("clamped", BoundaryCondition::Clamped { left: 0.0, right: 0.0 }),
            ("Clamped, 2, 3.5", BoundaryCondition::Clamped { left: 2.0, right: 3.5 }),
        ];
        for (text, expected) in cases {
            let task: SplineTask = format!("spline boundary: {}", text).parse().unwrap();
            assert_eq!(task.kind, SplineKind::Cubic(expected));
        }
    }

    #[test]
    fn test_invalid_documents() {
        let bad = [
            "spline kind: septic",
            "spline kind: cubic, pchip",
            "spline boundary: clamped, 1",
            "spline boundary: natural, 1, 2",
            "spline kind: akima boundary: natural",
            "spline kind: pchip degree: 2",
            "spline degree: -1 kind: bspline",
            "spline extrapolate: sometimes",
            "spline axis: 0.5",
            "settings condition_threshold: -3",
            "settings loglevel: info color: blue",
            "output file: x.txt",
        ];
        for text in bad {
            assert!(
                matches!(text.parse::<SplineTask>(), Err(SplineError::Config(_))),
                "accepted: {}",
                text
            );
        }
    }

    #[test]
    fn test_build_from_task() {
        let task: SplineTask = "spline kind: cubic boundary: natural".parse().unwrap();
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = vec![0.0, 1.0, 0.0, 1.0];
        let spline = task.build(&x, as_values(&y)).unwrap();
        let curvature = spline.evaluate_flat(&[0.0, 3.0], 2, None);
        assert_relative_eq!(curvature[[0, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(curvature[[1, 0]], 0.0, epsilon = 1e-12);

        // periodic ends must match within the configured tolerance
        let task: SplineTask = "spline boundary: periodic settings periodic_tolerance: 1e-3"
            .parse()
            .unwrap();
        let y = vec![0.0, 1.0, -1.0, 1e-4];
        assert!(task.build(&x, as_values(&y)).is_ok());
        let strict: SplineTask = "spline boundary: periodic".parse().unwrap();
        assert!(matches!(
            strict.build(&x, as_values(&y)),
            Err(SplineError::PeriodicMismatch { .. })
        ));
    }

    #[test]
    fn test_task_from_file() {
        let path = std::env::temp_dir().join("rusted_splines_task_parser_test.txt");
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "// interpolation recipe").unwrap();
            writeln!(file, "spline").unwrap();
            writeln!(file, "kind: akima").unwrap();
            writeln!(file, "extrapolate: true").unwrap();
        }
        let task = SplineTask::from_file(&path).unwrap();
        assert_eq!(task.kind, SplineKind::Akima);
        assert_eq!(task.extrapolate, Some(Extrapolate::Bool(true)));
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            SplineTask::from_file(&path),
            Err(SplineError::Config(_))
        ));
    }
}
