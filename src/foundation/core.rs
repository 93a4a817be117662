use crate::foundation::error::{RunesError, RunesResult};

/// Number of iterations a worker performs. Always `> 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RepeatCount(u32);

impl RepeatCount {
    /// Iterations per worker in the default scenario.
    pub const DEFAULT: Self = Self(5);

    pub fn new(n: u32) -> RunesResult<Self> {
        if n == 0 {
            return Err(RunesError::validation("repeat count must be > 0"));
        }
        Ok(Self(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Inclusive 1-based step range `1..=n`.
    pub fn steps(self) -> std::ops::RangeInclusive<u32> {
        1..=self.0
    }
}

impl TryFrom<u32> for RepeatCount {
    type Error = RunesError;

    fn try_from(n: u32) -> RunesResult<Self> {
        Self::new(n)
    }
}

impl From<RepeatCount> for u32 {
    fn from(r: RepeatCount) -> u32 {
        r.0
    }
}

impl std::fmt::Display for RepeatCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
