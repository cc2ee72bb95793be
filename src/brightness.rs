// SPDX-License-Identifier: GPL-3.0-only
//! Brightness calculation logic
//!
//! Shared arithmetic used by the devices, the protocol adapters and the sync
//! engine: clamping, proportional mapping of a master value onto a device range,
//! rescaling between native and percentage units, and transition step planning.

/// Clamp an arbitrary requested value into the canonical `0..=100` range
pub fn clamp_percent(value: i32) -> u16 {
    value.clamp(0, 100) as u16
}

/// Clamp an arbitrary requested value into `[min, max]`
pub fn clamp_to_range(value: i32, min: u16, max: u16) -> u16 {
    value.clamp(min as i32, max as i32) as u16
}

/// Map a master percentage onto a device range, preserving relative position
///
/// `min + (max - min) * target / 100`, rounded to the nearest integer and clamped
/// into `[min, max]`. Devices with a narrow range still reach their own maximum
/// at a master value of 100.
pub fn proportional_target(target: i32, min: u16, max: u16) -> u16 {
    let target = clamp_percent(target) as f64;
    let span = max.saturating_sub(min) as f64;
    let mapped = (min as f64 + span * (target / 100.0)).round();
    clamp_to_range(mapped as i32, min, max)
}

/// Convert a native protocol value into a percentage of `max`
pub fn native_to_percent(value: u32, max: u32) -> u16 {
    if max == 0 || max == 100 {
        return value.min(100) as u16;
    }
    let percent = (value as f64 * 100.0 / max as f64).round() as u32;
    percent.min(100) as u16
}

/// Convert a percentage into a native protocol value with the given maximum
pub fn percent_to_native(percent: u16, max: u32) -> u32 {
    if max == 0 || max == 100 {
        return percent.min(100) as u32;
    }
    (percent.min(100) as f64 * max as f64 / 100.0).round() as u32
}

/// Number of writes a stepped transition from `from` to `to` needs
///
/// `ceil(|to - from| / step_size)`; a zero step size is treated as 1.
pub fn transition_steps(from: u16, to: u16, step_size: u16) -> u32 {
    let distance = from.abs_diff(to) as u32;
    distance.div_ceil(step_size.max(1) as u32)
}

/// Value written at step `index` (1-based) of a transition of `steps` steps
///
/// Positions are computed from the start point rather than accumulated, so the
/// last step lands on `to` without drift.
pub fn step_value(from: u16, to: u16, index: u32, steps: u32) -> u16 {
    if steps == 0 || index >= steps {
        return to;
    }
    let delta = to as f64 - from as f64;
    let value = from as f64 + (delta * index as f64 / steps as f64).round();
    value.clamp(from.min(to) as f64, from.max(to) as f64) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-999_999), 0);
        assert_eq!(clamp_percent(42), 42);
        assert_eq!(clamp_percent(999_999), 100);
    }

    #[test]
    fn test_proportional_full_range() {
        assert_eq!(proportional_target(0, 0, 100), 0);
        assert_eq!(proportional_target(50, 0, 100), 50);
        assert_eq!(proportional_target(100, 0, 100), 100);
    }

    #[test]
    fn test_proportional_narrow_range() {
        assert_eq!(proportional_target(0, 45, 55), 45);
        assert_eq!(proportional_target(50, 45, 55), 50);
        assert_eq!(proportional_target(100, 45, 55), 55);
        assert_eq!(proportional_target(999_999, 45, 55), 55);
        assert_eq!(proportional_target(-999_999, 45, 55), 45);
    }

    #[test]
    fn test_proportional_rounding() {
        // 20 + 30 * 0.33 = 29.9
        assert_eq!(proportional_target(33, 20, 50), 30);
        // degenerate range
        assert_eq!(proportional_target(70, 30, 30), 30);
    }

    #[test]
    fn test_native_scaling() {
        assert_eq!(native_to_percent(50, 100), 50);
        assert_eq!(native_to_percent(32, 64), 50);
        assert_eq!(native_to_percent(19393, 19393), 100);
        assert_eq!(percent_to_native(50, 64), 32);
        assert_eq!(percent_to_native(100, 19393), 19393);
        assert_eq!(percent_to_native(30, 100), 30);
    }

    #[test]
    fn test_transition_steps() {
        assert_eq!(transition_steps(50, 50, 2), 0);
        assert_eq!(transition_steps(50, 80, 2), 15);
        assert_eq!(transition_steps(50, 55, 2), 3);
        assert_eq!(transition_steps(80, 50, 2), 15);
        assert_eq!(transition_steps(0, 5, 0), 5);
    }

    #[test]
    fn test_step_values_reach_target() {
        let steps = transition_steps(50, 55, 2);
        let values: Vec<u16> = (1..=steps).map(|i| step_value(50, 55, i, steps)).collect();
        assert_eq!(values, vec![52, 53, 55]);

        let steps = transition_steps(80, 71, 2);
        let values: Vec<u16> = (1..=steps).map(|i| step_value(80, 71, i, steps)).collect();
        assert_eq!(values.last(), Some(&71));
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
    }
}
