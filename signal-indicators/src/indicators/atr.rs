//! Average True Range (ATR).

use signal_core::HistoryBar;

use crate::core::{Indicator, IndicatorError};

/// True range / ATR over a stream of OHLC bars.
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    atr: Option<f64>,
    warmup_sum: f64,
    warmup_count: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::invalid_period("ATR", period));
        }
        Ok(Self {
            period,
            prev_close: None,
            atr: None,
            warmup_sum: 0.0,
            warmup_count: 0,
        })
    }

    fn true_range(bar: &HistoryBar, prev_close: f64) -> f64 {
        let high_low = bar.high - bar.low;
        let high_close = (bar.high - prev_close).abs();
        let low_close = (bar.low - prev_close).abs();
        high_low.max(high_close).max(low_close)
    }
}

impl Indicator for Atr {
    type Input = HistoryBar;
    type Output = f64;

    fn next(&mut self, input: Self::Input) -> Option<Self::Output> {
        let prev_close = self.prev_close.unwrap_or(input.close);
        let tr = Self::true_range(&input, prev_close);
        self.prev_close = Some(input.close);

        if let Some(current) = self.atr {
            let factor = (self.period - 1) as f64;
            let next = (current * factor + tr) / self.period as f64;
            self.atr = Some(next);
            Some(next)
        } else {
            self.warmup_sum += tr;
            self.warmup_count += 1;
            if self.warmup_count == self.period {
                let init = self.warmup_sum / self.period as f64;
                self.atr = Some(init);
                self.warmup_sum = 0.0;
                Some(init)
            } else {
                None
            }
        }
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.atr = None;
        self.warmup_sum = 0.0;
        self.warmup_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(close: f64) -> HistoryBar {
        HistoryBar {
            timestamp: Utc::now(),
            open: close,
            high: close + 5.0,
            low: close - 5.0,
            close,
            volume: 1.0,
            count: 1,
        }
    }

    #[test]
    fn atr_warms_up() {
        let mut atr = Atr::new(3).unwrap();
        assert!(atr.next(bar(100.0)).is_none());
        assert!(atr.next(bar(101.0)).is_none());
        assert!(atr.next(bar(102.0)).is_some());
    }
}
