/// An opaque value representing a snapshot in time captured from the underlying
/// platform.
///
/// Implements a subset of `std::time::Instant`, see:
/// https://doc.rust-lang.org/std/time/struct.Instant.html
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct SystemTime {
    /// Normal non-wasm time measurement provided by std
    #[cfg(not(target_arch = "wasm32"))]
    instant: std::time::Instant,
    /// JavaScript measures time since January 1, 1970 00:00:00 UTC in
    /// milliseconds.
    #[cfg(target_arch = "wasm32")]
    millis_since_epoch: f64,
}

impl SystemTime {
    /// Get the current system time.
    pub fn now() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                Self {
                    millis_since_epoch: js_sys::Date::now()
                }
            } else {
                Self {
                    instant: std::time::Instant::now()
                }
            }
        }
    }

    /// Time elapsed since `earlier`, saturating at zero if the platform clock
    /// went backwards.
    pub fn duration_since(&self, earlier: SystemTime) -> std::time::Duration {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                std::time::Duration::from_secs_f64(
                    ((self.millis_since_epoch - earlier.millis_since_epoch) / 1000.0).max(0.0),
                )
            } else {
                self.instant.saturating_duration_since(earlier.instant)
            }
        }
    }
}

impl std::ops::Sub<SystemTime> for SystemTime {
    type Output = std::time::Duration;

    fn sub(self, rhs: SystemTime) -> Self::Output {
        self.duration_since(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_minus_earlier_is_non_negative() {
        let earlier = SystemTime::now();
        let later = SystemTime::now();
        assert!(later >= earlier);
        assert_eq!(std::time::Duration::ZERO, earlier - later);
    }
}
