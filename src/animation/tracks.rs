use serde::{Deserialize, Serialize};

use crate::animation::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    /// Hold the value of the previous key.
    Constant,
    #[default]
    Linear,
}

/// Sorted keyframes of a single animated value.
///
/// Times are in scene frames. Sampling before the first key or after the last
/// one clamps to the boundary value.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    /// Builds a track from `(time, value)` pairs. Pairs are sorted by time.
    #[must_use]
    pub fn from_points(mut points: Vec<(f32, T)>, interpolation: InterpolationMode) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (times, values) = points.into_iter().unzip();
        Self {
            times,
            values,
            interpolation,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Samples the track, `None` when it has no keys.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        if self.times.is_empty() {
            return None;
        }

        // partition_point finds the first index where t > time, i.e. next_index
        let next_idx = self.times.partition_point(|&t| t <= time);
        if next_idx == 0 {
            return Some(self.values[0]);
        }

        Some(self.sample_at_frame(next_idx - 1, time))
    }

    fn sample_at_frame(&self, index: usize, time: f32) -> T {
        let len = self.times.len();

        // No next frame available
        if index >= len - 1 {
            return self.values[len - 1];
        }

        let next_idx = index + 1;
        let t0 = self.times[index];
        let t1 = self.times[next_idx];
        let dt = t1 - t0;

        // Prevent division by zero
        let t = if dt > 1e-6 { (time - t0) / dt } else { 0.0 };
        let t = t.clamp(0.0, 1.0);

        match self.interpolation {
            InterpolationMode::Constant => self.values[index],
            InterpolationMode::Linear => {
                T::interpolate_linear(self.values[index], self.values[next_idx], t)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn linear_midpoint() {
        let track = KeyframeTrack::from_points(vec![(0.0, 0.0_f32), (10.0, 10.0)], InterpolationMode::Linear);
        assert!(approx(track.sample(5.0).unwrap(), 5.0));
    }

    #[test]
    fn clamps_outside_range() {
        let track = KeyframeTrack::from_points(vec![(10.0, 1.0_f32), (20.0, 2.0)], InterpolationMode::Linear);
        assert!(approx(track.sample(0.0).unwrap(), 1.0));
        assert!(approx(track.sample(50.0).unwrap(), 2.0));
    }

    #[test]
    fn constant_holds_previous_key() {
        let track = KeyframeTrack::from_points(vec![(0.0, 1.0_f32), (10.0, 3.0)], InterpolationMode::Constant);
        assert!(approx(track.sample(9.9).unwrap(), 1.0));
        assert!(approx(track.sample(10.0).unwrap(), 3.0));
    }

    #[test]
    fn unsorted_points_are_sorted() {
        let track = KeyframeTrack::from_points(vec![(10.0, 3.0_f32), (0.0, 1.0)], InterpolationMode::Linear);
        assert_eq!(track.times, vec![0.0, 10.0]);
    }

    #[test]
    fn empty_track_samples_none() {
        let track: KeyframeTrack<f32> = KeyframeTrack::from_points(Vec::new(), InterpolationMode::Linear);
        assert!(track.sample(0.0).is_none());
    }
}
