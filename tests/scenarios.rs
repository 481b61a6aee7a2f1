use std::time::{Duration, Instant};

use qflow::{
    BBox, Config, Exception, FrameAnalysis, ObjectId, RawDetection, Scene, Settings, Stages,
};

const EXCEPTIONS_ONLY: Stages = Stages {
    detection: true,
    speed: false,
    exceptions: true,
};

const ALL: Stages = Stages {
    detection: true,
    speed: true,
    exceptions: true,
};

fn centered(id: Option<u32>, class: &str, cx: f32, cy: f32) -> RawDetection {
    RawDetection::new(
        id,
        class,
        0.9,
        BBox::ltrb(cx - 5.0, cy - 5.0, cx + 5.0, cy + 5.0),
    )
}

fn exception_of(out: &FrameAnalysis, id: ObjectId) -> Option<Exception> {
    out.tracks
        .iter()
        .find(|t| t.track_id == id)
        .and_then(|t| t.exception)
}

#[test]
fn line_crossing_counts_each_downward_pass() {
    let t0 = Instant::now();
    let mut scene = Scene::with_clock(&Config::default(), t0);
    let settings = Settings::default();
    let path = [50.0, 200.0, 210.0, 100.0, 160.0];

    let mut out = FrameAnalysis::default();
    let mut counts = Vec::new();
    for (frame, y) in path.iter().enumerate() {
        out = scene.process(frame as i64, 300, vec![centered(Some(7), "Sedan", 100.0, *y)], &settings, ALL, t0);
        counts.push(scene.flow().counter());
    }

    assert_eq!(out.line_y, Some(150.0));
    assert_eq!(counts, vec![0, 1, 1, 1, 2]);
}

#[test]
fn right_angle_turn_fires_once_per_frame() {
    let t0 = Instant::now();
    let mut scene = Scene::with_clock(&Config::default(), t0);
    let settings = Settings::default();
    let id = ObjectId::Tracked(3);

    let path = [(0.0, 0.0), (0.0, 20.0), (20.0, 20.0)];
    let mut outputs = Vec::new();
    for (frame, (x, y)) in path.iter().enumerate() {
        outputs.push(scene.process(frame as i64, 480, vec![centered(Some(3), "Bus", *x, *y)], &settings, EXCEPTIONS_ONLY, t0));
    }

    assert_eq!(exception_of(&outputs[0], id), None);
    assert_eq!(exception_of(&outputs[1], id), None);
    assert_eq!(exception_of(&outputs[2], id), Some(Exception::Trajectory));

    // the same frame delivered again must not re-fire
    let replay = scene.process(2, 480, vec![centered(Some(3), "Bus", 20.0, 20.0)], &settings, EXCEPTIONS_ONLY, t0);
    assert_eq!(exception_of(&replay, id), None);
}

#[test]
fn gentle_turn_below_threshold_is_ignored() {
    let t0 = Instant::now();
    let mut scene = Scene::with_clock(&Config::default(), t0);
    let settings = Settings::default();

    let path = [(0.0, 0.0), (0.0, 20.0), (5.0, 40.0)];
    let mut last = FrameAnalysis::default();
    for (frame, (x, y)) in path.iter().enumerate() {
        last = scene.process(frame as i64, 480, vec![centered(Some(4), "Bus", *x, *y)], &settings, EXCEPTIONS_ONLY, t0);
    }

    assert_eq!(exception_of(&last, ObjectId::Tracked(4)), None);
}

#[test]
fn collision_is_debounced_for_one_frame() {
    let t0 = Instant::now();
    let mut scene = Scene::with_clock(&Config::default(), t0);
    let settings = Settings::default();

    // inclusive iou of these two boxes is about 0.2
    let pair = || {
        vec![
            RawDetection::new(Some(1), "Truck", 0.9, BBox::ltrb(0., 0., 99., 99.)),
            RawDetection::new(Some(2), "Truck", 0.8, BBox::ltrb(66., 0., 165., 99.)),
        ]
    };

    let fired: Vec<bool> = (0..3)
        .map(|frame| {
            let out = scene.process(frame, 480, pair(), &settings, EXCEPTIONS_ONLY, t0);
            out.tracks
                .iter()
                .all(|t| t.exception == Some(Exception::Collision))
        })
        .collect();

    assert_eq!(fired, vec![true, false, true]);
}

#[test]
fn nested_boxes_are_not_collisions() {
    let t0 = Instant::now();
    let config = Config {
        dedup_iou: 0.9,
        ..Config::default()
    };
    let mut scene = Scene::with_clock(&config, t0);

    // iou around 0.82, above the nested-box bound
    let out = scene.process(
        0,
        480,
        vec![
            RawDetection::new(Some(1), "Truck", 0.9, BBox::ltrb(0., 0., 99., 99.)),
            RawDetection::new(Some(2), "Truck", 0.8, BBox::ltrb(10., 0., 109., 99.)),
        ],
        &Settings::default(),
        EXCEPTIONS_ONLY,
        t0,
    );

    assert_eq!(out.tracks.len(), 2);
    assert!(out.tracks.iter().all(|t| t.exception.is_none()));
}

#[test]
fn duplicate_boxes_keep_the_confident_one() {
    let t0 = Instant::now();
    let mut scene = Scene::with_clock(&Config::default(), t0);

    let out = scene.process(
        0,
        480,
        vec![
            RawDetection::new(Some(1), "Truck", 0.6, BBox::ltrb(0., 0., 99., 99.)),
            RawDetection::new(Some(2), "Truck", 0.8, BBox::ltrb(10., 0., 109., 99.)),
        ],
        &Settings::default(),
        EXCEPTIONS_ONLY,
        t0,
    );

    assert_eq!(out.tracks.len(), 1);
    assert_eq!(out.tracks[0].track_id, ObjectId::Tracked(2));
}

#[test]
fn untracked_detections_get_minted_identities() {
    let t0 = Instant::now();
    let mut scene = Scene::with_clock(&Config::default(), t0);

    let out = scene.process(
        0,
        480,
        vec![
            centered(None, "Tractor", 10.0, 10.0),
            centered(Some(1), "Sedan", 100.0, 100.0),
            centered(None, "Sedan", 300.0, 300.0),
        ],
        &Settings::default(),
        ALL,
        t0,
    );

    let mut ids: Vec<ObjectId> = out.tracks.iter().map(|t| t.track_id).collect();
    ids.sort();
    assert_eq!(
        ids,
        vec![ObjectId::Tracked(1), ObjectId::Minted(1), ObjectId::Minted(2)]
    );

    let counts = scene.snapshot().class_counts;
    assert_eq!(counts["Tractor"], 1);
    assert_eq!(counts["Sedan"], 2);
}

#[test]
fn reported_speed_never_exceeds_clamp() {
    let t0 = Instant::now();
    let mut scene = Scene::with_clock(&Config::default(), t0);
    let settings = Settings::default();

    let mut speeds = Vec::new();
    for frame in 0..40 {
        let x = frame as f32 * 400.0;
        let out = scene.process(frame, 480, vec![centered(Some(9), "Truck", x, 100.0)], &settings, ALL, t0);
        speeds.push(out.tracks[0].speed.unwrap());
    }

    assert!(speeds.iter().all(|s| (0.0..=200.0).contains(s)));
    assert!(speeds.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn silent_stream_zeroes_flow_rate() {
    let t0 = Instant::now();
    let mut scene = Scene::with_clock(&Config::default(), t0);
    let settings = Settings::default();

    scene.process(0, 300, vec![centered(Some(7), "Sedan", 100.0, 50.0)], &settings, ALL, t0);
    scene.process(1, 300, vec![centered(Some(7), "Sedan", 100.0, 200.0)], &settings, ALL, t0 + Duration::from_secs(5));
    assert_eq!(scene.flow().current_rate(), 180.0);

    let out = scene.process(2, 300, Vec::new(), &settings, ALL, t0 + Duration::from_secs(10));

    assert_eq!(out.flow_rate, Some(0.0));
    assert_eq!(scene.snapshot().flow_series(), vec![(1, 180.0), (2, 0.0)]);
}

#[test]
fn late_frames_leave_analytics_untouched() {
    let t0 = Instant::now();
    let mut scene = Scene::with_clock(&Config::default(), t0);
    let settings = Settings::default();
    let (turner, crosser, pair_a) = (ObjectId::Tracked(3), ObjectId::Tracked(7), ObjectId::Tracked(1));

    let frame = |turn: (f32, f32), cross_y: f32| {
        vec![
            centered(Some(3), "Bus", turn.0, turn.1),
            centered(Some(7), "Sedan", 500.0, cross_y),
            RawDetection::new(Some(1), "Truck", 0.9, BBox::ltrb(1000., 0., 1099., 99.)),
            RawDetection::new(Some(2), "Truck", 0.8, BBox::ltrb(1066., 0., 1165., 99.)),
        ]
    };

    scene.process(0, 300, frame((0.0, 0.0), 50.0), &settings, EXCEPTIONS_ONLY, t0);
    scene.process(1, 300, frame((0.0, 20.0), 200.0), &settings, EXCEPTIONS_ONLY, t0);
    let out = scene.process(2, 300, frame((20.0, 20.0), 210.0), &settings, EXCEPTIONS_ONLY, t0);
    assert_eq!(exception_of(&out, turner), Some(Exception::Trajectory));
    assert_eq!(exception_of(&out, pair_a), Some(Exception::Collision));
    assert_eq!(scene.flow().counter(), 1);

    let speed = scene.tracker().speed(&crosser);

    // frames 1 and 0 arrive again, with the crosser back above the line
    for (late, turn) in [(1, (0.0, 20.0)), (0, (0.0, 0.0))] {
        let out = scene.process(late, 300, frame(turn, 50.0), &settings, EXCEPTIONS_ONLY, t0);
        assert!(out.tracks.iter().all(|t| t.exception.is_none()));
    }
    assert_eq!(scene.tracker().speed(&crosser), speed);

    // frame 3 is still de-bounced against frame 2, frame 4 fires again
    let out = scene.process(3, 300, frame((40.0, 20.0), 220.0), &settings, EXCEPTIONS_ONLY, t0);
    assert!(out.tracks.iter().all(|t| t.exception.is_none()));
    let out = scene.process(4, 300, frame((60.0, 20.0), 230.0), &settings, EXCEPTIONS_ONLY, t0);
    assert_eq!(exception_of(&out, pair_a), Some(Exception::Collision));

    assert_eq!(scene.flow().counter(), 1);
}
