//! Relative Strength Index (RSI), Wilder-smoothed, scaled 0-100.

use std::marker::PhantomData;

use crate::core::{Indicator, IndicatorError, Input};

#[derive(Debug, Clone)]
pub struct Rsi<I = f64> {
    period: usize,
    prev_value: Option<f64>,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
    warmup_count: usize,
    gain_sum: f64,
    loss_sum: f64,
    marker: PhantomData<I>,
}

impl<I> Rsi<I>
where
    I: Input,
{
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::invalid_period("RSI", period));
        }

        Ok(Self {
            period,
            prev_value: None,
            avg_gain: None,
            avg_loss: None,
            warmup_count: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            marker: PhantomData,
        })
    }

    fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            100.0
        } else if avg_gain == 0.0 {
            0.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (rs + 1.0))
        }
    }
}

impl<I> Indicator for Rsi<I>
where
    I: Input,
{
    type Input = I;
    type Output = f64;

    fn next(&mut self, input: Self::Input) -> Option<Self::Output> {
        let value = input.value();

        let prev = match self.prev_value {
            Some(prev) => prev,
            None => {
                self.prev_value = Some(value);
                return None;
            }
        };

        let change = value - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.prev_value = Some(value);

        if self.avg_gain.is_none() {
            self.warmup_count += 1;
            self.gain_sum += gain;
            self.loss_sum += loss;

            if self.warmup_count < self.period {
                return None;
            }

            let avg_gain = self.gain_sum / self.period as f64;
            let avg_loss = self.loss_sum / self.period as f64;
            self.avg_gain = Some(avg_gain);
            self.avg_loss = Some(avg_loss);
            return Some(Self::compute_rsi(avg_gain, avg_loss));
        }

        let decay = (self.period - 1) as f64;
        let avg_gain = (self.avg_gain.unwrap() * decay + gain) / self.period as f64;
        let avg_loss = (self.avg_loss.unwrap() * decay + loss) / self.period as f64;
        self.avg_gain = Some(avg_gain);
        self.avg_loss = Some(avg_loss);

        Some(Self::compute_rsi(avg_gain, avg_loss))
    }

    fn reset(&mut self) {
        self.prev_value = None;
        self.avg_gain = None;
        self.avg_loss = None;
        self.warmup_count = 0;
        self.gain_sum = 0.0;
        self.loss_sum = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::Rsi;
    use crate::Indicator;

    #[test]
    fn waits_for_initial_window() {
        let mut rsi = Rsi::new(3).unwrap();
        assert_eq!(rsi.next(1.0), None);
        assert_eq!(rsi.next(2.0), None);
        assert_eq!(rsi.next(3.0), None);
        assert!(rsi.next(2.0).is_some());
    }

    #[test]
    fn constant_input_registers_as_overbought() {
        let mut rsi = Rsi::new(3).unwrap();
        for _ in 0..4 {
            rsi.next(1.0);
        }
        assert_eq!(rsi.next(1.0), Some(100.0));
    }

    #[test]
    fn reset_clears_buffers() {
        let mut rsi = Rsi::new(2).unwrap();
        rsi.next(1.0);
        rsi.next(2.0);
        assert!(rsi.next(3.0).is_some());
        rsi.reset();
        assert_eq!(rsi.next(3.0), None);
    }
}
