use crate::{Error, Result};

/// An implementation of a time-decaying value
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f64) -> f64;

    /// The closed interval `(min, max)` containing every value the schedule can take
    ///
    /// Either bound is infinite when the schedule grows without limit.
    fn range(&self) -> (f64, f64);
}

fn validate(rate: f64, vi: f64, vf: f64) -> Result<()> {
    ((rate >= 0.0 && vi > vf) || (rate < 0.0 && vi < vf))
        .then_some(())
        .ok_or(Error::InvalidHyperparameter {
            name: "rate",
            value: rate,
            interval: "[0, inf) when vi > vf, (-inf, 0) when vi < vf",
        })
}

fn span(vi: f64, vf: f64) -> (f64, f64) {
    (vi.min(vf), vi.max(vf))
}

/// A constant value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f64) -> f64 {
        self.value
    }

    fn range(&self) -> (f64, f64) {
        (self.value, self.value)
    }
}

/// v(t) = v<sub>f</sub> + (v<sub>i</sub> - v<sub>f</sub>) * e<sup>-rt</sup>
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Exponential {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl Exponential {
    pub fn new(rate: f64, vi: f64, vf: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Exponential {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf } = self;
        vf + (vi - vf) * (-rate * t).exp()
    }

    fn range(&self) -> (f64, f64) {
        if self.rate < 0.0 {
            (f64::NEG_INFINITY, self.vi)
        } else {
            span(self.vi, self.vf)
        }
    }
}

/// v(t) = v<sub>f</sub> + (v<sub>i</sub> - v<sub>f</sub>) / (1 + rt)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InverseTime {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl InverseTime {
    pub fn new(rate: f64, vi: f64, vf: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for InverseTime {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf } = self;
        vf + (vi - vf) / (1.0 + rate * t)
    }

    fn range(&self) -> (f64, f64) {
        // 1 + rt crosses zero for a negative rate
        if self.rate < 0.0 {
            (f64::NEG_INFINITY, f64::INFINITY)
        } else {
            span(self.vi, self.vf)
        }
    }
}

/// v(t) = max(v<sub>i</sub> - rt, v<sub>f</sub>)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Linear {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl Linear {
    pub fn new(rate: f64, vi: f64, vf: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Linear {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf } = self;
        (vi - rate * t).max(vf)
    }

    fn range(&self) -> (f64, f64) {
        if self.rate < 0.0 {
            (self.vf, f64::INFINITY)
        } else {
            span(self.vi, self.vf)
        }
    }
}

/// v(t) = max(v<sub>i</sub> * r<sup>floor(t/s)</sup>, v<sub>f</sub>)
///
/// Unlike the other schedules, `rate` here is a multiplicative factor in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Step {
    rate: f64,
    vi: f64,
    vf: f64,
    step: f64,
}

impl Step {
    pub fn new(rate: f64, vi: f64, vf: f64, step: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        crate::util::check_interval!(rate, 0.0, 1.0);
        crate::util::check_interval!(step, > 0.0, f64::MAX);
        Ok(Self { rate, vi, vf, step })
    }
}

impl Decay for Step {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf, step } = self;
        (vi * rate.powf((t / step).floor())).max(vf)
    }

    fn range(&self) -> (f64, f64) {
        span(self.vi, self.vf)
    }
}
