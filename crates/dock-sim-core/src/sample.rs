// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Sources of per-unit handling durations.
//!
//! Each sampler owns its own seeded random stream so that adding a sampler
//! somewhere in a model does not shift the numbers drawn elsewhere.

use crate::{SimVariable, time::TimeDelta};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Uniform};
use std::{fmt::Display, marker::PhantomData};

pub trait DurationSampler<T: SimVariable>: std::fmt::Debug + Send {
    fn sample(&mut self) -> TimeDelta<T>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplerError {
    NegativeDuration(f64),
    InvalidRange { min: f64, max: f64 },
    InvalidMean(f64),
}

impl Display for SamplerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerError::NegativeDuration(v) => {
                write!(f, "Duration {} must not be negative", v)
            }
            SamplerError::InvalidRange { min, max } => {
                write!(f, "Invalid duration range [{}, {}]", min, max)
            }
            SamplerError::InvalidMean(m) => {
                write!(f, "Mean duration {} must be finite and positive", m)
            }
        }
    }
}

impl std::error::Error for SamplerError {}

#[inline]
fn to_delta<T: SimVariable>(value: f64) -> TimeDelta<T> {
    TimeDelta::from_f64_ceil(value).unwrap_or_else(|| TimeDelta::new(T::max_value()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantSampler<T: SimVariable>(TimeDelta<T>);

impl<T: SimVariable> ConstantSampler<T> {
    pub fn new(duration: TimeDelta<T>) -> Result<Self, SamplerError> {
        if duration.is_negative() {
            return Err(SamplerError::NegativeDuration(duration.to_f64()));
        }
        Ok(Self(duration))
    }
}

impl<T: SimVariable> DurationSampler<T> for ConstantSampler<T> {
    #[inline]
    fn sample(&mut self) -> TimeDelta<T> {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct UniformSampler<T: SimVariable> {
    dist: Uniform<f64>,
    rng: ChaCha8Rng,
    _phantom: PhantomData<T>,
}

impl<T: SimVariable> UniformSampler<T> {
    /// Durations drawn uniformly from `[min, max]`, rounded up.
    pub fn new(min: f64, max: f64, seed: u64) -> Result<Self, SamplerError> {
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
            return Err(SamplerError::InvalidRange { min, max });
        }
        let dist =
            Uniform::new_inclusive(min, max).map_err(|_| SamplerError::InvalidRange { min, max })?;
        Ok(Self {
            dist,
            rng: ChaCha8Rng::seed_from_u64(seed),
            _phantom: PhantomData,
        })
    }
}

impl<T: SimVariable> DurationSampler<T> for UniformSampler<T> {
    fn sample(&mut self) -> TimeDelta<T> {
        to_delta(self.dist.sample(&mut self.rng))
    }
}

#[derive(Debug, Clone)]
pub struct ExponentialSampler<T: SimVariable> {
    dist: Exp<f64>,
    rng: ChaCha8Rng,
    _phantom: PhantomData<T>,
}

impl<T: SimVariable> ExponentialSampler<T> {
    /// Exponentially distributed durations with the given mean, rounded up.
    pub fn new(mean: f64, seed: u64) -> Result<Self, SamplerError> {
        if !mean.is_finite() || mean <= 0.0 {
            return Err(SamplerError::InvalidMean(mean));
        }
        let dist = Exp::new(1.0 / mean).map_err(|_| SamplerError::InvalidMean(mean))?;
        Ok(Self {
            dist,
            rng: ChaCha8Rng::seed_from_u64(seed),
            _phantom: PhantomData,
        })
    }
}

impl<T: SimVariable> DurationSampler<T> for ExponentialSampler<T> {
    fn sample(&mut self) -> TimeDelta<T> {
        to_delta(self.dist.sample(&mut self.rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_obj_safe!(DurationSampler<i64>);

    #[test]
    fn test_constant_sampler() {
        let mut s = ConstantSampler::new(TimeDelta::<i64>::new(4)).unwrap();
        assert_eq!(s.sample(), TimeDelta::new(4));
        assert!(ConstantSampler::new(TimeDelta::<i64>::new(-1)).is_err());
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let mut s = UniformSampler::<i64>::new(2.0, 5.0, 7).unwrap();
        for _ in 0..200 {
            let v = s.sample().value();
            assert!((2..=5).contains(&v), "sample {} out of range", v);
        }
    }

    #[test]
    fn test_uniform_rejects_inverted_range() {
        assert_eq!(
            UniformSampler::<i64>::new(5.0, 1.0, 0).unwrap_err(),
            SamplerError::InvalidRange { min: 5.0, max: 1.0 }
        );
    }

    #[test]
    fn test_exponential_is_reproducible() {
        let mut a = ExponentialSampler::<i64>::new(3.0, 11).unwrap();
        let mut b = ExponentialSampler::<i64>::new(3.0, 11).unwrap();
        for _ in 0..50 {
            let x = a.sample();
            assert_eq!(x, b.sample());
            assert!(!x.is_negative());
        }
        assert!(ExponentialSampler::<i64>::new(0.0, 0).is_err());
    }
}
