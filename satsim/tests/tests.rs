use rand::rngs::StdRng;
use rand::SeedableRng;

use satsim::simulation::compositor::{Compositor, ParallelCompositor, SequentialCompositor};
use satsim::simulation::integrator::{Integrator, ParallelIntegrator, SequentialIntegrator};
use satsim::{
    blend, generate_bodies, scan_closest, shade_pixel, BackendConfig, Body, BodyStore, ClosestScan, Color,
    ConsistencyOracle, Divergence, Engine, ExecutionBackend, FVec2, FramePhase, Parameters, PixelBuffer,
    Scenario, ScenarioConfig, SimError, Simulation, Strategies, ALLOWED_FP_ERROR,
};

/// Build a body with zero velocity
pub fn body_at(x: f32, y: f32, color: Color) -> Body {
    Body {
        identifier: color,
        position: FVec2::new(x, y),
        velocity: FVec2::zeros(),
    }
}

/// Default 1024x1024 parameters with a reduced substep count for tests
pub fn test_params(substeps: u32) -> Parameters {
    Parameters::new(1024, 1024, 1.0, 32.0, substeps)
}

/// Seeded 64-satellite store around the default center
pub fn seeded_store(seed: u64, params: &Parameters) -> BodyStore {
    generate_bodies(64, params, &mut StdRng::seed_from_u64(seed))
}

/// A handful of bodies inside a small canvas
pub fn small_canvas_store() -> BodyStore {
    BodyStore::new(vec![
        Body {
            identifier: Color::new(0.2, 0.1, 0.05),
            position: FVec2::new(20.0, 30.0),
            velocity: FVec2::new(0.0, 0.05),
        },
        Body {
            identifier: Color::new(0.12, 0.02, 0.16),
            position: FVec2::new(70.0, 20.0),
            velocity: FVec2::new(-0.03, 0.01),
        },
        Body {
            identifier: Color::new(0.25, 0.14, 0.0),
            position: FVec2::new(55.0, 62.0),
            velocity: FVec2::new(0.04, -0.02),
        },
    ])
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn integrators_agree_bitwise() {
    let params = test_params(2_000);
    let backend = ExecutionBackend::new(4).unwrap();
    let sequential = SequentialIntegrator::new(&params);
    let parallel = ParallelIntegrator::new(&params, backend);

    let mut reference = seeded_store(11, &params);
    let mut accelerated = reference.clone();

    for frame in 0..3 {
        sequential.advance(&mut reference).unwrap();
        parallel.advance(&mut accelerated).unwrap();
        assert_eq!(reference, accelerated, "stores differ after frame {frame}");
    }
    assert_ne!(reference, seeded_store(11, &params), "integration did not move anything");
}

#[test]
fn parallel_integrator_independent_of_thread_count() {
    let params = test_params(500);
    let template = seeded_store(3, &params);

    let mut outputs = Vec::new();
    for threads in [1, 2, 7] {
        let parallel = ParallelIntegrator::new(&params, ExecutionBackend::new(threads).unwrap());
        let mut store = template.clone();
        parallel.advance(&mut store).unwrap();
        outputs.push(store);
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
}

#[test]
fn body_at_center_is_rejected_by_both_forms() {
    let params = test_params(10);
    let store = BodyStore::new(vec![
        body_at(600.0, 512.0, Color::WHITE),
        body_at(512.0, 512.0, Color::WHITE),
        body_at(700.0, 512.0, Color::WHITE),
    ]);

    let sequential = SequentialIntegrator::new(&params);
    let mut seq_store = store.clone();
    let err = sequential.advance(&mut seq_store).unwrap_err();
    assert!(matches!(err, SimError::BodyAtCenter { index: 1 }));
    assert_eq!(seq_store, store, "sequential form touched the store");

    // neighbours of the bad body must not be advanced either
    for threads in [1, 3] {
        let parallel = ParallelIntegrator::new(&params, ExecutionBackend::new(threads).unwrap());
        let mut par_store = store.clone();
        let err = parallel.advance(&mut par_store).unwrap_err();
        assert!(matches!(err, SimError::BodyAtCenter { index: 1 }));
        assert_eq!(par_store, store, "parallel form touched the store ({threads} threads)");
    }
}

#[test]
fn stationary_body_falls_toward_center() {
    let params = test_params(100);
    let mut store = BodyStore::new(vec![body_at(662.0, 512.0, Color::WHITE)]);
    SequentialIntegrator::new(&params).advance(&mut store).unwrap();

    let b = store.bodies()[0];
    assert!(b.velocity.x < 0.0, "velocity should point at the center");
    assert!(b.position.x < 662.0);
    assert_eq!(b.position.y, 512.0);
}

#[test]
fn orbits_stay_bounded() {
    let params = test_params(1_000);
    let integrator = SequentialIntegrator::new(&params);
    let mut store = seeded_store(1, &params);

    let mut min_r = f32::INFINITY;
    let mut max_r = 0.0f32;
    for _ in 0..100 {
        integrator.advance(&mut store).unwrap();
        for b in store.bodies() {
            let r = (b.position - FVec2::new(512.0, 512.0)).norm();
            min_r = min_r.min(r);
            max_r = max_r.max(r);
        }
    }

    assert!(min_r > 1.0, "a satellite collapsed into the center (r = {min_r})");
    assert!(max_r < 2000.0, "a satellite escaped (r = {max_r})");
}

// ==================================================================================
// Compositor tests
// ==================================================================================

#[test]
fn pixel_on_body_is_white() {
    let params = test_params(1);
    let bodies = vec![body_at(662.0, 512.0, Color::new(0.2, 0.1, 0.1))];

    assert_eq!(shade_pixel(662, 512, &bodies, &params), Color::WHITE);
    // distance sqrt(5) is inside the 3.16 radius
    assert_eq!(shade_pixel(664, 513, &bodies, &params), Color::WHITE);
}

#[test]
fn override_ignores_other_bodies() {
    let params = test_params(1);
    let bodies = vec![
        body_at(100.0, 100.0, Color::new(0.9, 0.0, 0.0)),
        body_at(101.0, 100.0, Color::new(0.0, 0.9, 0.0)),
        body_at(300.0, 300.0, Color::new(0.0, 0.0, 0.9)),
    ];
    assert_eq!(shade_pixel(300, 302, &bodies, &params), Color::WHITE);
    assert!(matches!(
        scan_closest(FVec2::new(300.0, 302.0), &bodies, params.body_radius),
        ClosestScan::Hit { index: 2 }
    ));
}

#[test]
fn single_far_body_blends_to_identifier_times_gain() {
    let params = test_params(1);
    let id = Color::new(0.2, 0.1, 0.15);
    let bodies = vec![body_at(662.0, 512.0, id)];

    let c = shade_pixel(0, 0, &bodies, &params);
    assert_ne!(c, Color::WHITE);
    assert!((c.red - id.red * 3.0).abs() < 1e-4, "red {}", c.red);
    assert!((c.green - id.green * 3.0).abs() < 1e-4, "green {}", c.green);
    assert!((c.blue - id.blue * 3.0).abs() < 1e-4, "blue {}", c.blue);
}

#[test]
fn closest_color_seeding_adds_identifier() {
    let params = test_params(1).with_seed_closest_color(true);
    let id = Color::new(0.2, 0.1, 0.15);
    let bodies = vec![body_at(662.0, 512.0, id)];

    let c = shade_pixel(0, 0, &bodies, &params);
    assert!((c.red - id.red * 4.0).abs() < 1e-4, "red {}", c.red);
    assert!((c.blue - id.blue * 4.0).abs() < 1e-4, "blue {}", c.blue);
}

#[test]
fn blend_weights_sum_to_one() {
    let params = test_params(1);
    let store = seeded_store(5, &params);
    // white identifiers make every channel equal to the sum of normalized weights
    let bodies: Vec<Body> = store
        .bodies()
        .iter()
        .map(|b| Body { identifier: Color::WHITE, ..*b })
        .collect();

    for (x, y) in [(0usize, 0usize), (512, 512), (1023, 7), (300, 800), (700, 100)] {
        let pixel = FVec2::new(x as f32, y as f32);
        let weight_sum = match scan_closest(pixel, &bodies, params.body_radius) {
            ClosestScan::Miss { weight_sum, .. } => weight_sum,
            ClosestScan::Hit { .. } => continue,
        };
        let c = blend(pixel, &bodies, weight_sum, 1.0, Color::BLACK);
        assert!((c.red - 1.0).abs() < 1e-3, "pixel ({x}, {y}) sums to {}", c.red);
    }
}

#[test]
fn equidistant_bodies_lowest_index_wins() {
    let left = body_at(90.0, 100.0, Color::new(0.1, 0.0, 0.0));
    let right = body_at(110.0, 100.0, Color::new(0.0, 0.1, 0.0));
    let far = body_at(400.0, 400.0, Color::new(0.0, 0.0, 0.1));
    let pixel = FVec2::new(100.0, 100.0);

    for bodies in [vec![left, right], vec![right, left], vec![far, right, left]] {
        let expected = if bodies.len() == 3 { 1 } else { 0 };
        match scan_closest(pixel, &bodies, 3.16) {
            ClosestScan::Miss { closest, distance, .. } => {
                assert_eq!(closest, Some(expected));
                assert_eq!(distance, 10.0);
            }
            other => panic!("unexpected override {other:?}"),
        }
    }
}

#[test]
fn compositors_agree() {
    let params = Parameters::new(96, 80, 1.0, 32.0, 1);
    let store = small_canvas_store();
    let backend = ExecutionBackend::new(3).unwrap();

    let mut reference = PixelBuffer::new(96, 80);
    SequentialCompositor::new(&params).composite(&store, &mut reference);

    // tile heights that do and do not divide the canvas
    for tile_rows in [1, 7, 16, 200] {
        let mut accelerated = PixelBuffer::new(96, 80);
        ParallelCompositor::new(&params, tile_rows, backend.clone()).composite(&store, &mut accelerated);
        assert_eq!(reference, accelerated, "tile_rows = {tile_rows}");
    }

    assert_eq!(reference.get(20, 30), Some(Color::WHITE));
    assert_ne!(reference.get(0, 79), Some(Color::WHITE));
}

// ==================================================================================
// Oracle tests
// ==================================================================================

fn filled(width: usize, height: usize, color: Color) -> PixelBuffer {
    let mut buf = PixelBuffer::new(width, height);
    for px in buf.as_mut_slice() {
        *px = color;
    }
    buf
}

#[test]
fn oracle_tolerates_small_differences() {
    let oracle = ConsistencyOracle::default();
    let reference = filled(8, 6, Color::new(0.5, 0.5, 0.5));
    let accelerated = filled(8, 6, Color::new(0.57, 0.43, 0.56));
    assert_eq!(oracle.compare_pixels(&reference, &accelerated), None);
}

#[test]
fn oracle_tolerance_is_inclusive() {
    let oracle = ConsistencyOracle::default();
    let reference = filled(4, 4, Color::BLACK);

    // difference of exactly the tolerance passes
    let at_limit = filled(4, 4, Color::new(ALLOWED_FP_ERROR, 0.0, -ALLOWED_FP_ERROR));
    assert_eq!(oracle.compare_pixels(&reference, &at_limit), None);

    // one ulp past it fails
    let past = f32::from_bits(ALLOWED_FP_ERROR.to_bits() + 1);
    let mut over = at_limit.clone();
    assert!(over.set(2, 1, Color::new(0.0, past, 0.0)));
    assert!(matches!(
        oracle.compare_pixels(&reference, &over),
        Some(Divergence::Pixel { x: 2, y: 1, .. })
    ));
}

#[test]
fn pixel_buffer_ignores_writes_off_canvas() {
    let mut buf = filled(4, 3, Color::BLACK);
    assert!(!buf.set(4, 0, Color::WHITE));
    assert!(!buf.set(0, 3, Color::WHITE));
    assert_eq!(buf, filled(4, 3, Color::BLACK));

    assert!(buf.set(3, 2, Color::WHITE));
    assert_eq!(buf.get(3, 2), Some(Color::WHITE));
    assert_eq!(buf.get(3, 3), None);
}

#[test]
fn oracle_reports_first_bad_pixel() {
    let oracle = ConsistencyOracle::default();
    let reference = filled(8, 6, Color::new(0.5, 0.5, 0.5));
    let mut accelerated = reference.clone();
    accelerated.set(5, 2, Color::new(0.5, 0.5, 0.6));
    accelerated.set(1, 4, Color::new(0.0, 0.5, 0.5));

    match oracle.compare_pixels(&reference, &accelerated) {
        Some(Divergence::Pixel { x, y, .. }) => assert_eq!((x, y), (5, 2)),
        other => panic!("expected pixel divergence, got {other:?}"),
    }
}

#[test]
fn oracle_flags_nan_pixels() {
    let oracle = ConsistencyOracle::default();
    let reference = filled(4, 4, Color::BLACK);
    let mut accelerated = reference.clone();
    accelerated.set(3, 3, Color::new(f32::NAN, 0.0, 0.0));

    assert!(matches!(
        oracle.compare_pixels(&reference, &accelerated),
        Some(Divergence::Pixel { x: 3, y: 3, .. })
    ));
}

#[test]
fn oracle_requires_exact_body_state() {
    let oracle = ConsistencyOracle::default();
    let params = test_params(1);
    let reference = seeded_store(9, &params);
    let mut accelerated = reference.clone();
    assert_eq!(oracle.compare_bodies(&reference, &accelerated), None);

    let v = accelerated.bodies()[3].velocity;
    accelerated.bodies_mut()[3].velocity.x = f32::from_bits(v.x.to_bits() + 1);
    assert_eq!(oracle.compare_bodies(&reference, &accelerated), Some(Divergence::Body { index: 3 }));
}

#[test]
fn oracle_finds_non_finite_bodies() {
    let oracle = ConsistencyOracle::default();
    let mut store = small_canvas_store();
    assert_eq!(oracle.find_non_finite(&store), None);
    store.bodies_mut()[2].position.y = f32::INFINITY;
    assert_eq!(oracle.find_non_finite(&store), Some(Divergence::NonFinite { index: 2 }));
}

// ==================================================================================
// Frame driver tests
// ==================================================================================

fn small_engine() -> Engine {
    Engine {
        backend: BackendConfig::Parallel,
        threads: 2,
        validation_frames: 2,
        allowed_fp_error: 0.08,
        tile_rows: 8,
    }
}

fn small_simulation() -> Simulation {
    let params = Parameters::new(96, 80, 1.0, 32.0, 200);
    let engine = small_engine();
    let accelerated = engine.accelerated_strategies(&params).unwrap();
    let reference = engine.reference_strategies(&params);
    Simulation::with_strategies(params, engine, small_canvas_store(), accelerated, reference)
}

#[test]
fn driver_walks_through_phases() {
    let mut sim = small_simulation();
    let mut phases = Vec::new();

    for _ in 0..5 {
        let report = sim.advance_frame().unwrap();
        phases.push(report.phase);
        match report.phase {
            FramePhase::Validating => {
                let validation = report.validation.expect("validation frames carry a report");
                assert!(validation.passed(), "{validation:?}");
            }
            FramePhase::Warming => assert!(report.timings.total.is_none()),
            FramePhase::Steady => assert!(report.timings.total.is_some()),
        }
    }

    assert_eq!(
        phases,
        vec![
            FramePhase::Validating,
            FramePhase::Validating,
            FramePhase::Warming,
            FramePhase::Steady,
            FramePhase::Steady,
        ]
    );
    assert_eq!(sim.frame(), 5);
    assert_eq!(sim.stats().frames(), 2);
    assert_eq!(sim.pixels().len(), 96 * 80);
}

/// Accelerated integrator that nudges one body after integrating correctly
struct NudgingIntegrator {
    inner: SequentialIntegrator,
    index: usize,
}

impl Integrator for NudgingIntegrator {
    fn name(&self) -> &'static str {
        "nudging"
    }

    fn advance(&self, store: &mut BodyStore) -> satsim::Result<()> {
        self.inner.advance(store)?;
        store.bodies_mut()[self.index].position.x += 0.5;
        Ok(())
    }
}

/// Accelerated compositor that paints one pixel wrong
struct SmudgedCompositor {
    inner: SequentialCompositor,
    x: usize,
    y: usize,
}

impl Compositor for SmudgedCompositor {
    fn name(&self) -> &'static str {
        "smudged"
    }

    fn composite(&self, store: &BodyStore, out: &mut PixelBuffer) {
        self.inner.composite(store, out);
        let c = out.get(self.x, self.y).unwrap_or_default();
        out.set(self.x, self.y, Color::new(c.red + 0.5, c.green, c.blue));
    }
}

#[test]
fn driver_reports_divergence_without_stopping() {
    let params = Parameters::new(96, 80, 1.0, 32.0, 50);
    let engine = small_engine();
    let accelerated = Strategies {
        integrator: Box::new(NudgingIntegrator {
            inner: SequentialIntegrator::new(&params),
            index: 1,
        }),
        compositor: Box::new(SmudgedCompositor {
            inner: SequentialCompositor::new(&params),
            x: 40,
            y: 33,
        }),
    };
    let reference = engine.reference_strategies(&params);
    let mut sim = Simulation::with_strategies(params, engine, small_canvas_store(), accelerated, reference);

    for frame in 0..2 {
        let report = sim.advance_frame().unwrap();
        let validation = report.validation.unwrap();
        assert_eq!(validation.bodies, Some(Divergence::Body { index: 1 }), "frame {frame}");
        assert!(
            matches!(validation.pixels, Some(Divergence::Pixel { x: 40, y: 33, .. })),
            "frame {frame}: {:?}",
            validation.pixels
        );
    }

    // past the window the oracle is inert
    let report = sim.advance_frame().unwrap();
    assert_eq!(report.phase, FramePhase::Warming);
    assert!(report.validation.is_none());
}

#[test]
fn failed_frame_leaves_state_untouched() {
    let params = Parameters::new(96, 80, 1.0, 32.0, 20);
    let engine = Engine {
        validation_frames: 0,
        ..small_engine()
    };
    let store = BodyStore::new(vec![
        body_at(20.0, 30.0, Color::new(0.2, 0.1, 0.05)),
        body_at(48.0, 40.0, Color::new(0.1, 0.1, 0.1)),
        body_at(70.0, 20.0, Color::new(0.12, 0.02, 0.16)),
    ]);
    let accelerated = engine.accelerated_strategies(&params).unwrap();
    let reference = engine.reference_strategies(&params);
    let mut sim = Simulation::with_strategies(params, engine, store.clone(), accelerated, reference);

    let err = sim.advance_frame().unwrap_err();
    assert!(matches!(err, SimError::BodyAtCenter { index: 1 }));
    assert_eq!(sim.frame(), 0);
    assert_eq!(sim.store(), &store);
}

#[test]
fn reference_and_presented_buffers_do_not_alias() {
    let mut sim = small_simulation();
    sim.advance_frame().unwrap();
    assert_ne!(
        sim.pixel_buffer().as_slice().as_ptr(),
        sim.reference_pixels().as_slice().as_ptr()
    );
    assert_eq!(sim.pixel_buffer(), sim.reference_pixels());
}

// ==================================================================================
// Scenario / configuration tests
// ==================================================================================

#[test]
fn scenario_defaults_match_classic_setup() {
    let cfg = ScenarioConfig::from_yaml_str("parameters:\n  seed: 17\n").unwrap();
    let scenario = Scenario::build_scenario(cfg).unwrap();

    assert_eq!(scenario.store.len(), 64);
    assert_eq!(scenario.seed, Some(17));
    assert_eq!((scenario.parameters.width, scenario.parameters.height), (1024, 1024));
    assert_eq!(scenario.parameters.center, satsim::DVec2::new(512.0, 512.0));
    assert_eq!(scenario.parameters.substeps, 100_000);
    assert_eq!(scenario.parameters.step, 32.0 / 100_000.0);
    assert_eq!(scenario.parameters.body_radius, 3.16);
    assert_eq!(scenario.engine.validation_frames, 2);
    assert_eq!(scenario.engine.allowed_fp_error, 0.08);
    assert_eq!(scenario.engine.backend, BackendConfig::Parallel);
}

#[test]
fn scenario_rejects_invalid_settings() {
    let cases = [
        "parameters:\n  substeps: 0\n",
        "parameters:\n  width: 0\n",
        "parameters:\n  satellite_count: 0\n",
        "parameters:\n  body_radius: -1.0\n",
        "engine:\n  tile_rows: 0\n",
        "bodies:\n  - position: [512.0, 512.0]\n    velocity: [0.0, 0.0]\n    color: [0.1, 0.1, 0.1]\n",
    ];
    for text in cases {
        let cfg = ScenarioConfig::from_yaml_str(text).unwrap();
        assert!(
            matches!(Scenario::build_scenario(cfg), Err(SimError::Config(_))),
            "accepted: {text}"
        );
    }
}

#[test]
fn sequential_backend_runs_end_to_end() {
    let text = "engine:\n  backend: \"sequential\"\nparameters:\n  width: 64\n  height: 48\n  substeps: 20\nbodies:\n  - position: [10.0, 10.0]\n    velocity: [0.0, 0.1]\n    color: [0.2, 0.1, 0.1]\n  - position: [50.0, 40.0]\n    velocity: [0.1, 0.0]\n    color: [0.1, 0.1, 0.2]\n";
    let scenario = Scenario::build_scenario(ScenarioConfig::from_yaml_str(text).unwrap()).unwrap();
    let mut sim = Simulation::new(scenario).unwrap();

    for _ in 0..4 {
        let report = sim.advance_frame().unwrap();
        if let Some(v) = report.validation {
            assert!(v.passed());
        }
    }
    assert!(sim.store().bodies().iter().all(|b| b.is_finite()));
}
