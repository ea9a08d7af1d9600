//! Bollinger Band breakout: enters when the close punches through a band,
//! exits on reversion to the middle band or a stop-loss.

use signal_core::{decimal_to_f64, Candle, EngineError, HistoryBar, Position, PositionSide, StrategyConfig};
use signal_indicators::{BollingerBands, Indicator};

use crate::logic::{EntryDecision, ExitDecision, StrategyLogic};
use crate::strategies::params::{f64_param, usize_param};
use signal_strategy_macros::register_strategy;

pub struct BollingerBreakout {
    period: usize,
    std_multiplier: f64,
    stop_loss_pct: f64,
}

impl BollingerBreakout {
    fn latest_bands(&self, closes: &[f64]) -> Option<signal_indicators::BollingerBandsOutput> {
        let mut bb = BollingerBands::new(self.period, self.std_multiplier).ok()?;
        let mut last = None;
        for value in closes {
            last = bb.next(*value).or(last);
        }
        last
    }
}

impl StrategyLogic for BollingerBreakout {
    fn build(config: &StrategyConfig) -> Result<Self, EngineError> {
        let period = usize_param(&config.params, "period", 20);
        if period == 0 {
            return Err(EngineError::CatalogInit(
                "BollingerBreakout requires a non-zero period".to_string(),
            ));
        }
        Ok(BollingerBreakout {
            period,
            std_multiplier: f64_param(&config.params, "std_multiplier", 2.0),
            stop_loss_pct: f64_param(&config.params, "stop_loss_pct", 0.02),
        })
    }

    fn min_bars(&self) -> usize {
        self.period
    }

    fn evaluate_entry(&mut self, candle: &Candle, history: &[HistoryBar]) -> Option<EntryDecision> {
        let mut closes: Vec<f64> = history.iter().map(|bar| bar.close).collect();
        let close = decimal_to_f64(candle.close);
        closes.push(close);
        let bands = self.latest_bands(&closes)?;

        if close > bands.upper {
            Some(EntryDecision {
                side: PositionSide::Long,
                price: candle.close,
                confidence: 0.55,
            })
        } else if close < bands.lower {
            Some(EntryDecision {
                side: PositionSide::Short,
                price: candle.close,
                confidence: 0.55,
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
        let bands = self.latest_bands(&closes)?;

        let reverted = match position.side {
            PositionSide::Long => close <= bands.middle,
            PositionSide::Short => close >= bands.middle,
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

register_strategy!(BollingerBreakout, "BollingerBreakout");

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
            name: "BollingerBreakout".to_string(),
            version: "1.0.0".to_string(),
            params: serde_json::json!({"period": 4, "std_multiplier": 1.0}),
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
    fn enters_long_on_upper_band_breakout() {
        let mut logic = BollingerBreakout::build(&config()).unwrap();
        let history: Vec<HistoryBar> = [10.0, 10.0, 10.0, 10.0].iter().map(|v| bar(*v)).collect();
        let decision = logic.evaluate_entry(&candle("20"), &history);
        assert!(decision.is_some());
        assert_eq!(decision.unwrap().side, PositionSide::Long);
    }
}
