//! Internal timestamp helpers.
//!
//! Conversions between stream timestamps, frame numbers and the
//! `AV_TIME_BASE` microsecond timestamps FFmpeg expects for container-level
//! seeking. Arithmetic runs on the exact rationals in 128-bit integers.

use ffmpeg_sys_next::AV_TIME_BASE as AV_TIME_BASE_C;

use crate::metadata::FrameRate;

/// Microseconds per second.
const AV_TIME_BASE: i128 = AV_TIME_BASE_C as i128;

/// Frame number of a presentation timestamp, rounded to the nearest frame.
///
/// `pts` must already be relative to the stream's start time. `time_base` is
/// the stream time base as `(numerator, denominator)`. Negative timestamps map
/// to frame 0.
pub(crate) fn pts_to_frame_number(pts: i64, time_base: (i32, i32), frame_rate: FrameRate) -> u64 {
    let (tb_num, tb_den) = (i128::from(time_base.0), i128::from(time_base.1));
    let numerator = i128::from(pts) * tb_num * i128::from(frame_rate.numerator);
    let denominator = tb_den * i128::from(frame_rate.denominator);
    if denominator <= 0 || numerator <= 0 {
        return 0;
    }
    ((numerator + denominator / 2) / denominator) as u64
}

/// Seek target in `AV_TIME_BASE` units for the start of `frame_number`.
pub(crate) fn frame_number_to_seek_timestamp(frame_number: u64, frame_rate: FrameRate) -> i64 {
    if frame_rate.numerator == 0 {
        return 0;
    }
    let micros = i128::from(frame_number) * i128::from(frame_rate.denominator) * AV_TIME_BASE
        / i128::from(frame_rate.numerator);
    micros.min(i128::from(i64::MAX)) as i64
}

/// A stream timestamp in `AV_TIME_BASE` units, rounded toward negative
/// infinity so a seek target built from it never lands late.
pub(crate) fn stream_ts_to_av_time_base(ts: i64, time_base: (i32, i32)) -> i64 {
    let (tb_num, tb_den) = (i128::from(time_base.0), i128::from(time_base.1));
    if tb_den <= 0 {
        return 0;
    }
    let micros = (i128::from(ts) * tb_num * AV_TIME_BASE).div_euclid(tb_den);
    micros.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// First frame to seek to on retry `attempt` when decoding overshot
/// `frame_number`.
///
/// Attempt 0 targets the frame itself; each later attempt backs off by one
/// second of frames, doubled every time, until it reaches frame 0.
pub(crate) fn seek_retry_origin(frame_number: u64, attempt: u32, frame_rate: FrameRate) -> u64 {
    if attempt == 0 {
        return frame_number;
    }
    let one_second = u64::from(frame_rate.numerator)
        .div_ceil(u64::from(frame_rate.denominator.max(1)))
        .max(1);
    let backoff = one_second.saturating_mul(1u64 << (attempt - 1).min(63));
    frame_number.saturating_sub(backoff)
}

/// Frames covered by a stream duration expressed in the stream's time base.
pub(crate) fn stream_duration_to_frame_count(
    duration: i64,
    time_base: (i32, i32),
    frame_rate: FrameRate,
) -> u64 {
    if duration <= 0 {
        return 0;
    }
    pts_to_frame_number(duration, time_base, frame_rate)
}

/// Frames covered by `duration_micros` (an `AV_TIME_BASE` duration).
pub(crate) fn duration_to_frame_count(duration_micros: i64, frame_rate: FrameRate) -> u64 {
    if duration_micros <= 0 || frame_rate.denominator == 0 {
        return 0;
    }
    let numerator = i128::from(duration_micros) * i128::from(frame_rate.numerator);
    let denominator = AV_TIME_BASE * i128::from(frame_rate.denominator);
    ((numerator + denominator / 2) / denominator) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const NTSC: FrameRate = FrameRate::new(30000, 1001);

    #[test]
    fn pts_maps_to_frames() {
        // 1/90000 time base, 25 fps: 3600 ticks per frame.
        let rate = FrameRate::new(25, 1);
        assert_eq!(pts_to_frame_number(0, (1, 90000), rate), 0);
        assert_eq!(pts_to_frame_number(3600, (1, 90000), rate), 1);
        assert_eq!(pts_to_frame_number(3600 * 250, (1, 90000), rate), 250);
    }

    #[test]
    fn ntsc_pts_rounds_to_exact_frame() {
        // Time base 1001/30000: one tick per frame.
        for frame in [0u64, 1, 2, 1000, 123_456] {
            assert_eq!(pts_to_frame_number(frame as i64, (1001, 30000), NTSC), frame);
        }
        // 1/30000 time base: 1001 ticks per frame, with slight jitter.
        assert_eq!(pts_to_frame_number(1001 * 7 - 3, (1, 30000), NTSC), 7);
    }

    #[test]
    fn negative_pts_is_frame_zero() {
        assert_eq!(pts_to_frame_number(-512, (1, 1000), NTSC), 0);
    }

    #[test]
    fn seek_timestamps() {
        assert_eq!(frame_number_to_seek_timestamp(25, FrameRate::new(25, 1)), 1_000_000);
        assert_eq!(frame_number_to_seek_timestamp(30, NTSC), 1_001_000);
        assert_eq!(frame_number_to_seek_timestamp(5, FrameRate::new(0, 1)), 0);
    }

    #[test]
    fn start_time_in_microseconds() {
        // MPEG-TS style 90 kHz start of 1.4 s.
        assert_eq!(stream_ts_to_av_time_base(126_000, (1, 90000)), 1_400_000);
        assert_eq!(stream_ts_to_av_time_base(0, (1, 90000)), 0);
        // Negative start times round down, never toward zero.
        assert_eq!(stream_ts_to_av_time_base(-1, (1, 3)), -333_334);
        assert_eq!(stream_ts_to_av_time_base(-2002, (1, 30000)), -66_734);
        assert_eq!(stream_ts_to_av_time_base(5, (1, 0)), 0);
    }

    #[test]
    fn retry_origins_back_off_to_zero() {
        let rate = FrameRate::new(25, 1);
        let origins: Vec<u64> = (0..6)
            .map(|attempt| seek_retry_origin(300, attempt, rate))
            .collect();
        assert_eq!(origins, vec![300, 275, 250, 200, 100, 0]);
        assert_eq!(seek_retry_origin(10, 1, NTSC), 0);
        assert_eq!(seek_retry_origin(7, 40, rate), 0);
    }

    #[test]
    fn frame_count_from_stream_duration() {
        // 10 s of video at 25 fps in a 1/1000 (Matroska) time base.
        let rate = FrameRate::new(25, 1);
        assert_eq!(stream_duration_to_frame_count(10_000, (1, 1000), rate), 250);
        assert_eq!(stream_duration_to_frame_count(1001 * 30, (1, 30000), NTSC), 30);
        assert_eq!(stream_duration_to_frame_count(0, (1, 1000), rate), 0);
        assert_eq!(stream_duration_to_frame_count(-5, (1, 1000), rate), 0);
    }

    #[test]
    fn frame_count_from_duration() {
        assert_eq!(duration_to_frame_count(10_000_000, FrameRate::new(24, 1)), 240);
        assert_eq!(duration_to_frame_count(1_001_000, NTSC), 30);
        assert_eq!(duration_to_frame_count(0, NTSC), 0);
    }
}
