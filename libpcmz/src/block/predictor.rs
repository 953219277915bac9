//! Block predictors and their exact inverses
//!
//! History never crosses a block boundary: every block starts as if the
//! samples before it were zero. Linear and lpc predictions are clamped to
//! the 16-bit range so residuals stay within ±65535.

use serde::{Deserialize, Serialize};

use crate::core::{CodecError, CodecResult};

/// fixed-point shift for lpc weights (Q12)
pub const LPC_SHIFT: u32 = 12;

/// 2·s[i-1] − s[i-2] in Q12
pub const DEFAULT_LPC_WEIGHTS: [i32; 2] = [2 << LPC_SHIFT, -(1 << LPC_SHIFT)];

/// default moving-average window
pub const DEFAULT_LINEAR_ORDER: usize = 4;

/// longest history any predictor may look at
pub const MAX_ORDER: usize = 32;

/// strategy tag stored in each block record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictorMethod {
    Constant,
    Linear,
    Lpc,
}

impl PredictorMethod {
    pub fn name(self) -> &'static str {
        match self {
            PredictorMethod::Constant => "constant",
            PredictorMethod::Linear => "linear",
            PredictorMethod::Lpc => "lpc",
        }
    }
}

/// a predictor together with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Predictor {
    /// s[i-1]
    #[default]
    Constant,
    /// floor of the mean of the previous `order` samples
    Linear { order: usize },
    /// (Σ w_j · s[i-j]) >> 12
    Lpc { weights: Vec<i32> },
}

impl Predictor {
    pub fn linear() -> Self {
        Predictor::Linear {
            order: DEFAULT_LINEAR_ORDER,
        }
    }

    pub fn lpc() -> Self {
        Predictor::Lpc {
            weights: DEFAULT_LPC_WEIGHTS.to_vec(),
        }
    }

    pub fn method(&self) -> PredictorMethod {
        match self {
            Predictor::Constant => PredictorMethod::Constant,
            Predictor::Linear { .. } => PredictorMethod::Linear,
            Predictor::Lpc { .. } => PredictorMethod::Lpc,
        }
    }

    /// coefficients as stored in a block record
    pub fn coefficients(&self) -> Vec<i32> {
        match self {
            Predictor::Constant => vec![],
            Predictor::Linear { order } => vec![*order as i32],
            Predictor::Lpc { weights } => weights.clone(),
        }
    }

    /// Rebuild a predictor from a record's method tag and coefficients.
    pub fn from_record(method: PredictorMethod, coefficients: &[i32]) -> CodecResult<Self> {
        let predictor = match method {
            PredictorMethod::Constant => Predictor::Constant,
            PredictorMethod::Linear => match coefficients {
                [order] if *order >= 1 => Predictor::Linear {
                    order: *order as usize,
                },
                _ => {
                    return Err(CodecError::corrupt(format!(
                        "linear block needs one positive window length, got {:?}",
                        coefficients
                    )))
                }
            },
            PredictorMethod::Lpc => Predictor::Lpc {
                weights: coefficients.to_vec(),
            },
        };
        predictor.validate()?;
        Ok(predictor)
    }

    pub fn validate(&self) -> CodecResult<()> {
        let order = match self {
            Predictor::Constant => 1,
            Predictor::Linear { order } => *order,
            Predictor::Lpc { weights } => weights.len(),
        };
        if order > MAX_ORDER || (matches!(self, Predictor::Linear { .. }) && order == 0) {
            return Err(CodecError::corrupt(format!(
                "{} predictor order {} outside 1..={}",
                self.method().name(),
                order,
                MAX_ORDER
            )));
        }
        Ok(())
    }

    /// Prediction for position `i` from `history[..i]`.
    fn predict(&self, history: &[i32], i: usize) -> i32 {
        match self {
            Predictor::Constant => {
                if i == 0 {
                    0
                } else {
                    history[i - 1]
                }
            }
            Predictor::Linear { order } => {
                let n = (*order).min(i);
                if n == 0 {
                    return 0;
                }
                let sum: i64 = history[i - n..i].iter().map(|&s| s as i64).sum();
                clamp_i16(sum.div_euclid(n as i64))
            }
            Predictor::Lpc { weights } => {
                let mut acc: i64 = 0;
                for (j, &w) in weights.iter().enumerate() {
                    if i > j {
                        acc += w as i64 * history[i - j - 1] as i64;
                    }
                }
                clamp_i16(acc >> LPC_SHIFT)
            }
        }
    }

    /// residual[i] = sample[i] − prediction(i)
    pub fn residuals(&self, samples: &[i16]) -> Vec<i32> {
        let history: Vec<i32> = samples.iter().map(|&s| s as i32).collect();
        (0..history.len())
            .map(|i| history[i] - self.predict(&history, i))
            .collect()
    }

    /// sample[i] = prediction(i) + residual[i], clamped to 16 bits
    pub fn reconstruct(&self, residuals: &[i32]) -> Vec<i16> {
        let mut history: Vec<i32> = Vec::with_capacity(residuals.len());
        for (i, &residual) in residuals.iter().enumerate() {
            let prediction = self.predict(&history, i);
            let sample = clamp_i16(prediction as i64 + residual as i64);
            history.push(sample);
        }
        history.into_iter().map(|s| s as i16).collect()
    }
}

#[inline]
fn clamp_i16(value: i64) -> i32 {
    value.clamp(i16::MIN as i64, i16::MAX as i64) as i32
}
