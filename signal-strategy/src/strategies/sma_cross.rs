//! Fast/slow simple-moving-average crossover, grounded on the teacher's
//! `SmaCross` reference strategy but recomputing both averages from the
//! history window on every call rather than keeping streaming indicator
//! state, since `history` is refetched whole on every gate-7 evaluation.

use signal_core::{decimal_to_f64, Candle, EngineError, HistoryBar, Position, PositionSide, StrategyConfig};

use crate::logic::{EntryDecision, ExitDecision, StrategyLogic};
use crate::strategies::params::{f64_param, sma_over, usize_param};
use signal_strategy_macros::register_strategy;

pub struct SmaCross {
    fast_period: usize,
    slow_period: usize,
    stop_loss_pct: f64,
}

fn crossed_up(fast_prev: f64, slow_prev: f64, fast_now: f64, slow_now: f64) -> bool {
    fast_prev <= slow_prev && fast_now > slow_now
}

fn crossed_down(fast_prev: f64, slow_prev: f64, fast_now: f64, slow_now: f64) -> bool {
    fast_prev >= slow_prev && fast_now < slow_now
}

impl SmaCross {
    fn averages(&self, closes: &[f64]) -> Option<(f64, f64, f64, f64)> {
        if closes.len() <= self.slow_period {
            return None;
        }
        let now = &closes[closes.len() - self.slow_period..];
        let prev = &closes[closes.len() - self.slow_period - 1..closes.len() - 1];

        let fast_now = sma_over(&now[now.len() - self.fast_period..]);
        let slow_now = sma_over(now);
        let fast_prev = sma_over(&prev[prev.len() - self.fast_period..]);
        let slow_prev = sma_over(prev);
        Some((fast_prev, slow_prev, fast_now, slow_now))
    }
}

impl StrategyLogic for SmaCross {
    fn build(config: &StrategyConfig) -> Result<Self, EngineError> {
        let fast_period = usize_param(&config.params, "fast_period", 10);
        let slow_period = usize_param(&config.params, "slow_period", 30);
        if fast_period == 0 || slow_period == 0 || fast_period >= slow_period {
            return Err(EngineError::CatalogInit(format!(
                "SmaCross requires fast_period < slow_period (both > 0), got {fast_period}/{slow_period}"
            )));
        }
        Ok(SmaCross {
            fast_period,
            slow_period,
            stop_loss_pct: f64_param(&config.params, "stop_loss_pct", 0.02),
        })
    }

    fn min_bars(&self) -> usize {
        self.slow_period
    }

    fn evaluate_entry(&mut self, candle: &Candle, history: &[HistoryBar]) -> Option<EntryDecision> {
        let mut closes: Vec<f64> = history.iter().map(|bar| bar.close).collect();
        closes.push(decimal_to_f64(candle.close));
        let (fast_prev, slow_prev, fast_now, slow_now) = self.averages(&closes)?;

        if crossed_up(fast_prev, slow_prev, fast_now, slow_now) {
            Some(EntryDecision {
                side: PositionSide::Long,
                price: candle.close,
                confidence: 0.6,
            })
        } else if crossed_down(fast_prev, slow_prev, fast_now, slow_now) {
            Some(EntryDecision {
                side: PositionSide::Short,
                price: candle.close,
                confidence: 0.6,
            })
        } else {
            None
        }
    }

    fn evaluate_exit(
        &mut self,
        candle: &Candle,
        history: &[HistoryBar],
        position: &Position,
    ) -> Option<ExitDecision> {
        let entry_price = decimal_to_f64(position.entry_price);
        let close = decimal_to_f64(candle.close);

        let stop_hit = match position.side {
            PositionSide::Long => close <= entry_price * (1.0 - self.stop_loss_pct),
            PositionSide::Short => close >= entry_price * (1.0 + self.stop_loss_pct),
        };
        if stop_hit {
            return Some(ExitDecision {
                price: candle.close,
                confidence: 0.8,
                reason: "stop_loss".to_string(),
            });
        }

        let mut closes: Vec<f64> = history.iter().map(|bar| bar.close).collect();
        closes.push(close);
        let (fast_prev, slow_prev, fast_now, slow_now) = self.averages(&closes)?;

        let reversed = match position.side {
            PositionSide::Long => crossed_down(fast_prev, slow_prev, fast_now, slow_now),
            PositionSide::Short => crossed_up(fast_prev, slow_prev, fast_now, slow_now),
        };
        if reversed {
            Some(ExitDecision {
                price: candle.close,
                confidence: 0.6,
                reason: "regime_reversal".to_string(),
            })
        } else {
            None
        }
    }
}

register_strategy!(SmaCross, "SmaCross");

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use signal_core::{StrategyStatus, TradingMode};
    use std::str::FromStr;
    use uuid::Uuid;

    fn config() -> StrategyConfig {
        StrategyConfig {
            id: Uuid::new_v4(),
            name: "SmaCross".to_string(),
            version: "1.0.0".to_string(),
            params: serde_json::json!({"fast_period": 2, "slow_period": 4}),
            symbols: vec!["BTCUSDT".to_string()],
            timeframes: vec!["5m".to_string()],
            mode: TradingMode::Paper,
            init_periods: 4,
            status: StrategyStatus::Active,
            is_live: false,
        }
    }

    fn bar(close: f64) -> HistoryBar {
        HistoryBar {
            timestamp: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            count: 1,
        }
    }

    fn candle(close: &str) -> Candle {
        Candle {
            symbol: "BTCUSDT".to_string(),
            timeframe: "5m".to_string(),
            timestamp: Some(Utc::now()),
            open: Decimal::from_str(close).unwrap(),
            high: Decimal::from_str(close).unwrap(),
            low: Decimal::from_str(close).unwrap(),
            close: Decimal::from_str(close).unwrap(),
            volume: Decimal::ONE,
            count: 1,
        }
    }

    #[test]
    fn rejects_fast_not_less_than_slow() {
        let mut bad = config();
        bad.params = serde_json::json!({"fast_period": 10, "slow_period": 5});
        assert!(SmaCross::build(&bad).is_err());
    }

    #[test]
    fn detects_upward_crossover() {
        let mut logic = SmaCross::build(&config()).unwrap();
        // Declining then sharply rising closes force a fast-over-slow cross.
        let history: Vec<HistoryBar> = [10.0, 9.0, 8.0, 7.0].iter().map(|v| bar(*v)).collect();
        let decision = logic.evaluate_entry(&candle("20"), &history);
        assert!(decision.is_some());
        assert_eq!(decision.unwrap().side, PositionSide::Long);
    }
}
