use super::*;
use crate::io::{load_binding_matrix, load_phi_json, RunOutputs};
use crate::stats::RunTag;
use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;

/// One block with a TU at the origin, a distant TU, and a TF at `tf_x` (if any).
fn block(timestep: u64, tf_x: Option<f64>) -> String {
    let mut atoms = vec![
        "1 1 5.0 5.0 5.0".to_string(),
        "2 2 0.0 0.0 0.0".to_string(),
        "3 2 40.0 0.0 0.0".to_string(),
    ];
    if let Some(x) = tf_x {
        atoms.push(format!("4 3 {} 0.0 0.0 0.0 1", x));
    }
    let mut out = String::new();
    writeln!(out, "ITEM: TIMESTEP\n{}", timestep).unwrap();
    writeln!(out, "ITEM: NUMBER OF ATOMS\n{}", atoms.len()).unwrap();
    writeln!(out, "ITEM: BOX BOUNDS pp pp pp\n-50 50\n-50 50\n-50 50").unwrap();
    writeln!(out, "ITEM: ATOMS id type x y z vx").unwrap();
    for atom in atoms {
        writeln!(out, "{}", atom).unwrap();
    }
    out
}

fn ten_frame_trajectory() -> String {
    // TU 2 bound at timesteps 100, 400, 900; TU 3 bound at 500
    (0..10u64)
        .map(|i| {
            let tf_x = match i {
                1 | 4 | 9 => Some(3.0),
                5 => Some(38.0),
                7 => None,
                _ => Some(20.0),
            };
            block(i * 100, tf_x)
        })
        .collect()
}

#[test]
fn test_three_of_ten_frames_bound() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pos_Np_1_run_1.lammpstrj");
    fs::write(&path, ten_frame_trajectory()).unwrap();

    let (matrix, phi) = parse(&path, CoordinateMode::Raw, 3.5).unwrap();

    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix.row(2).map(<[bool]>::len), Some(10));
    assert_eq!(phi.get(2), Some(0.3));
    assert_eq!(phi.get(3), Some(0.1));
    assert!(matrix.rows().all(|(_, states)| states.len() == 10));
}

#[test]
fn test_dropped_frames_do_not_count() {
    let mut text = ten_frame_trajectory();
    text.push_str("ITEM: TIMESTEP\n1000\nITEM: NUMBER OF ATOMS\n4\nITEM: ATOMS id type x y z\n2 2 0 0 0\n");
    let reader = TrajectoryReader::new(Cursor::new(text.into_bytes()), CoordinateMode::Raw);

    let analysis = analyze_reader(reader, BindingClassifier::default(), Path::new("memory")).unwrap();

    assert_eq!(analysis.total_timesteps, 10);
    assert_eq!(analysis.dropped_frames, 1);
    assert_eq!(analysis.phi.get(2), Some(0.3));
}

#[test]
fn test_box_scaled_trajectory() {
    let text = "ITEM: TIMESTEP\n0\nITEM: NUMBER OF ATOMS\n2\nITEM: BOX BOUNDS pp pp pp\n0 100\n0 100\n0 100\nITEM: ATOMS id type xs ys zs\n1 2 0.50 0.5 0.5\n2 3 0.53 0.5 0.5\n";
    let reader = TrajectoryReader::new(Cursor::new(text.as_bytes().to_vec()), CoordinateMode::BoxScaled);
    let analysis = analyze_reader(reader, BindingClassifier::default(), Path::new("memory")).unwrap();

    // 0.03 box lengths = 3.0 units apart
    assert_eq!(analysis.phi.get(1), Some(1.0));

    let raw = TrajectoryReader::new(Cursor::new(text.as_bytes().to_vec()), CoordinateMode::Raw);
    let analysis = analyze_reader(raw, BindingClassifier::new(0.01).unwrap(), Path::new("memory")).unwrap();
    assert_eq!(analysis.phi.get(1), Some(0.0));
}

#[test]
fn test_empty_trajectory_is_absent_result() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.lammpstrj");
    fs::write(&path, "not a trajectory\n").unwrap();

    let err = parse(&path, CoordinateMode::Raw, 3.5).unwrap_err();
    assert!(matches!(err, PhiError::EmptyTrajectory { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_missing_file_reports_io_error() {
    let dir = TempDir::new().unwrap();
    let err = parse(&dir.path().join("absent.lammpstrj"), CoordinateMode::Raw, 3.5).unwrap_err();
    assert!(matches!(err, PhiError::Io { .. }));
}

#[test]
fn test_outputs_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("traj.lammpstrj");
    fs::write(&path, ten_frame_trajectory()).unwrap();
    let (matrix, phi) = parse(&path, CoordinateMode::Raw, 3.5).unwrap();

    let outputs = RunOutputs::new(dir.path(), dir.path(), RunTag::new(10, 4));
    outputs.write(&matrix, &phi).unwrap();

    assert_eq!(load_binding_matrix(&outputs.matrix_json).unwrap(), matrix);
    assert_eq!(load_phi_json(&outputs.phi_json).unwrap(), phi);
    for (_, states) in load_binding_matrix(&outputs.matrix_json).unwrap().rows() {
        assert_eq!(states.len(), 10);
    }
}

#[test]
fn test_distance_series() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("traj.lammpstrj");
    fs::write(&path, format!("{}{}", block(0, Some(3.0)), block(10, None))).unwrap();

    let samples = nearest_distance_series(&path, CoordinateMode::Raw, BindingClassifier::default()).unwrap();

    assert_eq!(samples.len(), 4);
    assert_eq!(samples[0], DistanceSample { timestep: 0, tu: 2, distance: Some(3.0) });
    assert_eq!(samples[1].distance, Some(37.0));
    assert!(samples[2..].iter().all(|s| s.timestep == 10 && s.distance.is_none()));
}

#[test]
fn test_undecodable_bytes_keep_earlier_frames() {
    let mut bytes = ten_frame_trajectory().into_bytes();
    bytes.extend_from_slice(b"ITEM: TIMESTEP\n1000\nITEM: NUMBER OF ATOMS\n4\nITEM: ATOMS id type x y z\n");
    bytes.extend_from_slice(b"3 2 \xff\xfe 0 0\n");
    let reader = TrajectoryReader::new(Cursor::new(bytes), CoordinateMode::Raw);

    let analysis =
        analyze_reader(reader, BindingClassifier::default(), Path::new("memory")).unwrap();

    assert_eq!(analysis.total_timesteps, 10);
    assert_eq!(analysis.dropped_frames, 1);
    assert_eq!(analysis.skipped_records, 1);
    assert_eq!(analysis.phi.get(2), Some(0.3));
}

#[test]
fn test_non_finite_box_bounds_frame_not_counted() {
    let mut text = ten_frame_trajectory();
    text.push_str("ITEM: TIMESTEP\n1000\nITEM: NUMBER OF ATOMS\n2\nITEM: BOX BOUNDS pp pp pp\nnan 100\n0 100\n0 100\nITEM: ATOMS id type xs ys zs\n2 2 0.5 0.5 0.5\n4 3 0.5 0.5 0.5\n");
    let reader = TrajectoryReader::new(Cursor::new(text.into_bytes()), CoordinateMode::Raw);

    let analysis =
        analyze_reader(reader, BindingClassifier::default(), Path::new("memory")).unwrap();

    assert_eq!(analysis.total_timesteps, 10);
    assert_eq!(analysis.dropped_frames, 1);
}
