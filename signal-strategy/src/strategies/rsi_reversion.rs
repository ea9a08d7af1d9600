//! RSI mean-reversion: enters long when the oscillator is oversold, short
//! when overbought, and exits on a reversion back through the midline or a
//! stop-loss.

use signal_core::{decimal_to_f64, Candle, EngineError, HistoryBar, Position, PositionSide, StrategyConfig};
use signal_indicators::{Indicator, Rsi};

use crate::logic::{EntryDecision, ExitDecision, StrategyLogic};
use crate::strategies::params::{f64_param, usize_param};
use signal_strategy_macros::register_strategy;

pub struct RsiReversion {
    period: usize,
    oversold: f64,
    overbought: f64,
    stop_loss_pct: f64,
}

impl RsiReversion {
    fn latest_rsi(&self, closes: &[f64]) -> Option<f64> {
        let mut rsi = Rsi::new(self.period).ok()?;
        let mut last = None;
        for value in closes {
            last = rsi.next(*value).or(last);
        }
        last
    }
}

impl StrategyLogic for RsiReversion {
    fn build(config: &StrategyConfig) -> Result<Self, EngineError> {
        let period = usize_param(&config.params, "period", 14);
        if period == 0 {
            return Err(EngineError::CatalogInit(
                "RsiReversion requires a non-zero period".to_string(),
            ));
        }
        Ok(RsiReversion {
            period,
            oversold: f64_param(&config.params, "oversold", 30.0),
            overbought: f64_param(&config.params, "overbought", 70.0),
            stop_loss_pct: f64_param(&config.params, "stop_loss_pct", 0.03),
        })
    }

    fn min_bars(&self) -> usize {
        self.period
    }

    fn evaluate_entry(&mut self, candle: &Candle, history: &[HistoryBar]) -> Option<EntryDecision> {
        let mut closes: Vec<f64> = history.iter().map(|bar| bar.close).collect();
        closes.push(decimal_to_f64(candle.close));
        let rsi = self.latest_rsi(&closes)?;

        if rsi <= self.oversold {
            Some(EntryDecision {
                side: PositionSide::Long,
                price: candle.close,
                confidence: ((self.oversold - rsi) / self.oversold).clamp(0.1, 1.0),
            })
        } else if rsi >= self.overbought {
            Some(EntryDecision {
                side: PositionSide::Short,
                price: candle.close,
                confidence: ((rsi - self.overbought) / (100.0 - self.overbought)).clamp(0.1, 1.0),
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
        let rsi = self.latest_rsi(&closes)?;

        let reverted = match position.side {
            PositionSide::Long => rsi >= 50.0,
            PositionSide::Short => rsi <= 50.0,
        };
        if reverted {
            Some(ExitDecision {
                price: candle.close,
                confidence: 0.5,
                reason: "regime_reversal".to_string(),
            })
        } else {
            None
        }
    }
}

register_strategy!(RsiReversion, "RsiReversion");

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
            name: "RsiReversion".to_string(),
            version: "1.0.0".to_string(),
            params: serde_json::json!({"period": 3}),
            symbols: vec!["BTCUSDT".to_string()],
            timeframes: vec!["5m".to_string()],
            mode: TradingMode::Paper,
            init_periods: 3,
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
    fn enters_long_when_oversold() {
        let mut logic = RsiReversion::build(&config()).unwrap();
        let history: Vec<HistoryBar> = [10.0, 8.0, 6.0].iter().map(|v| bar(*v)).collect();
        let decision = logic.evaluate_entry(&candle("4"), &history);
        assert!(decision.is_some());
        assert_eq!(decision.unwrap().side, PositionSide::Long);
    }
}
