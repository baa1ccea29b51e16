use std::{fmt, ops, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("time overflow")]
pub struct TimeOverflow;

/// A presentation timestamp in microseconds.
///
/// Timestamps are relative to the start of a track, so zero for one track is not zero for another.
/// This is NOT a wall clock time; see [crate::Clock] for the mapping.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(u64);

impl Timestamp {
	pub const ZERO: Self = Self(0);
	pub const MAX: Self = Self(u64::MAX);

	const SCALE: u64 = 1_000_000;

	pub const fn from_micros(micros: u64) -> Self {
		Self(micros)
	}

	pub const fn from_millis(millis: u64) -> Result<Self, TimeOverflow> {
		Self::from_scale(millis, 1_000)
	}

	pub const fn from_secs(secs: u64) -> Result<Self, TimeOverflow> {
		match secs.checked_mul(Self::SCALE) {
			Some(micros) => Ok(Self(micros)),
			None => Err(TimeOverflow),
		}
	}

	/// Convert from an arbitrary timescale, such as the 90kHz clock used by video containers.
	///
	/// A timescale of zero is an error.
	pub const fn from_scale(value: u64, scale: u64) -> Result<Self, TimeOverflow> {
		if scale == 0 {
			return Err(TimeOverflow);
		}

		let micros = value as u128 * Self::SCALE as u128 / scale as u128;
		if micros > u64::MAX as u128 {
			return Err(TimeOverflow);
		}

		Ok(Self(micros as u64))
	}

	pub const fn as_micros(self) -> u64 {
		self.0
	}

	pub const fn as_millis(self) -> u64 {
		self.0 / 1_000
	}

	pub fn as_secs_f64(self) -> f64 {
		self.0 as f64 / Self::SCALE as f64
	}

	pub const fn checked_add(self, rhs: Self) -> Option<Self> {
		match self.0.checked_add(rhs.0) {
			Some(micros) => Some(Self(micros)),
			None => None,
		}
	}

	pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
		match self.0.checked_sub(rhs.0) {
			Some(micros) => Some(Self(micros)),
			None => None,
		}
	}

	pub fn saturating_sub(self, rhs: Self) -> Self {
		Self(self.0.saturating_sub(rhs.0))
	}
}

impl TryFrom<Duration> for Timestamp {
	type Error = TimeOverflow;

	fn try_from(duration: Duration) -> Result<Self, Self::Error> {
		u64::try_from(duration.as_micros()).map(Self).map_err(|_| TimeOverflow)
	}
}

impl From<Timestamp> for Duration {
	fn from(timestamp: Timestamp) -> Self {
		Duration::from_micros(timestamp.0)
	}
}

impl ops::Add<Duration> for Timestamp {
	type Output = Timestamp;

	// Saturates rather than panicking; timestamps this large are nonsense anyway.
	fn add(self, rhs: Duration) -> Self::Output {
		let rhs = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
		Self(self.0.saturating_add(rhs))
	}
}

impl ops::Sub for Timestamp {
	type Output = Duration;

	/// The duration between two timestamps, or zero if `rhs` is later.
	fn sub(self, rhs: Self) -> Self::Output {
		Duration::from_micros(self.0.saturating_sub(rhs.0))
	}
}

impl fmt::Debug for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", Duration::from_micros(self.0))
	}
}

impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:.3}s", self.as_secs_f64())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_scale() {
		assert_eq!(Timestamp::from_scale(90_000, 90_000).unwrap(), Timestamp::from_secs(1).unwrap());
		assert_eq!(Timestamp::from_scale(3_003, 90_000).unwrap().as_micros(), 33_366);
		assert_eq!(Timestamp::from_millis(1_500).unwrap().as_micros(), 1_500_000);
		assert_eq!(Timestamp::from_secs(u64::MAX), Err(TimeOverflow));
		assert_eq!(Timestamp::from_scale(1, 0), Err(TimeOverflow));
	}

	#[test]
	fn test_arithmetic() {
		let a = Timestamp::from_millis(100).unwrap();
		let b = Timestamp::from_millis(250).unwrap();

		assert_eq!(b - a, Duration::from_millis(150));
		assert_eq!(a - b, Duration::ZERO);
		assert_eq!(a + Duration::from_millis(150), b);
		assert_eq!(b.checked_sub(a), Some(Timestamp::from_millis(150).unwrap()));
		assert_eq!(a.checked_sub(b), None);
	}

	#[test]
	fn test_duration() {
		let duration = Duration::from_micros(12_345);
		let timestamp = Timestamp::try_from(duration).unwrap();
		assert_eq!(Duration::from(timestamp), duration);
	}
}
