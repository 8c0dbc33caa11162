//! FFmpeg engine integration tests.
//!
//! Tests that read media need `tests/fixtures/sample_video.mp4` and return
//! early when it is absent.

use std::path::Path;

use avs2yuv::{
    Avs2YuvError, ConvertOptions, FfmpegEngine, FfmpegLogLevel, FrameSource, PixelFormat, Plane,
    SourceFrame, pipeline, source,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

#[test]
fn open_nonexistent_script() {
    let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Quiet).expect("engine");

    let error = source::open_normalized(&mut engine, "this_script_does_not_exist.avs").unwrap_err();

    assert!(matches!(error, Avs2YuvError::ScriptOpen { .. }));
    assert_eq!(error.exit_code(), 1);
}

#[test]
fn open_garbage_script() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("garbage.avs");
    std::fs::write(&path, b"\x00\x01 this is not a script").expect("Failed to write file");

    let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Quiet).expect("engine");
    let result = source::open_normalized(&mut engine, &path);

    assert!(result.is_err(), "Expected error for garbage input");
}

#[test]
fn sample_opens_as_planar_420() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Error).expect("engine");
    let clip = source::open_normalized(&mut engine, path).expect("open");
    let metadata = clip.metadata();

    assert!(metadata.width > 0);
    assert!(metadata.height > 0);
    assert!(metadata.frame_count > 0);
    assert!(metadata.frame_rate.is_valid());
    assert_eq!(metadata.pixel_format, PixelFormat::Yuv420p);
}

#[test]
fn fetched_planes_cover_the_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Error).expect("engine");
    let mut clip = source::open_normalized(&mut engine, path).expect("open");
    let (width, height) = (clip.metadata().width, clip.metadata().height);

    let frame = clip.fetch(0).expect("fetch frame 0");
    for plane in Plane::ALL {
        let view = frame.plane(plane).expect("plane present");
        let (plane_width, plane_height) = plane.dimensions(width, height);
        assert!(view.stride() >= plane_width);
        assert_eq!(view.row(plane_height - 1, plane_width).len(), plane_width);
    }
}

#[test]
fn fetch_past_the_end_is_a_frame_error() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Error).expect("engine");
    let mut clip = source::open_normalized(&mut engine, path).expect("open");
    let past_end = clip.metadata().frame_count + 10;

    let error = clip.fetch(past_end).map(|_| ()).unwrap_err();
    assert_eq!(error.frame_number(), Some(past_end));
}

#[test]
fn seeking_backwards_returns_the_same_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Error).expect("engine");
    let mut clip = source::open_normalized(&mut engine, path).expect("open");
    let width = clip.metadata().width as usize;

    let first_row = |clip: &mut avs2yuv::FfmpegClip, n: u64| -> Vec<u8> {
        let frame = clip.fetch(n).expect("fetch");
        let view = frame.plane(Plane::Y).expect("luma");
        view.row(0, width).to_vec()
    };

    let before = first_row(&mut clip, 5);
    let _ = first_row(&mut clip, 10);
    let after = first_row(&mut clip, 5);
    assert_eq!(before, after);
}

#[test]
fn sample_converts_to_a_stream() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Error).expect("engine");
    let mut out = Vec::new();
    let summary = pipeline::convert(
        &mut engine,
        path,
        Some(&mut out),
        &ConvertOptions::new().with_seek(2).with_frames(3),
    )
    .expect("conversion");

    assert_eq!(summary.frames_processed, 3);
    assert!(out.starts_with(b"YUV4MPEG2 W"));
    assert_eq!(out.len() as u64, summary.bytes_written);

    let header_len = out.iter().position(|&byte| byte == b'\n').expect("header") + 1;
    let clip = source::open_normalized(&mut engine, path).expect("reopen");
    let record = 6 + clip.metadata().frame_size();
    assert_eq!(out.len() - header_len, 3 * record);
}

fn luma_plane(clip: &mut avs2yuv::FfmpegClip, frame_number: u64) -> Vec<u8> {
    let (width, height) = (clip.metadata().width, clip.metadata().height);
    let frame = clip.fetch(frame_number).expect("fetch");
    let view = frame.plane(Plane::Y).expect("luma");
    let (plane_width, plane_height) = Plane::Y.dimensions(width, height);
    (0..plane_height)
        .flat_map(|row| view.row(row, plane_width).to_vec())
        .collect()
}

#[test]
fn frame_count_matches_decoded_frames() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Error).expect("engine");
    let mut clip = source::open_normalized(&mut engine, path).expect("open");
    let frame_count = clip.metadata().frame_count;

    for frame_number in 0..frame_count {
        if let Err(error) = clip.fetch(frame_number).map(|_| ()) {
            panic!("frame {frame_number} of {frame_count} could not be decoded: {error}");
        }
    }

    let summary = pipeline::convert(&mut engine, path, None, &ConvertOptions::new())
        .expect("full dry run");
    assert_eq!(summary.frames_processed, frame_count);
}

#[test]
fn random_access_matches_sequential_decode() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut engine = FfmpegEngine::with_log_level(FfmpegLogLevel::Error).expect("engine");
    let mut sequential = source::open_normalized(&mut engine, path).expect("open");
    let last = sequential.metadata().frame_count.min(40);
    let reference: Vec<Vec<u8>> = (0..last)
        .map(|frame_number| luma_plane(&mut sequential, frame_number))
        .collect();

    let mut seeking = source::open_normalized(&mut engine, path).expect("reopen");
    let mut order: Vec<u64> = (0..last).rev().step_by(3).collect();
    order.extend((0..last).step_by(7));
    for frame_number in order {
        assert_eq!(
            luma_plane(&mut seeking, frame_number),
            reference[frame_number as usize],
            "frame {frame_number} differs after seeking",
        );
    }
}
