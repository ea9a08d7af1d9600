//! Conversions between `signal-core` domain types and the generated wire
//! types, grounded on the teacher's `to_decimal_proto`/`from_decimal_proto`/
//! `to_timestamp_proto` helpers.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use signal_core::timestamp::{normalize_timestamp, RawTimestamp};
use signal_core::{Candle, Signal, SignalSide, TradingMode};

use crate::proto;

pub fn to_decimal_proto(value: Decimal) -> proto::Decimal {
    proto::Decimal {
        value: value.to_string(),
    }
}

pub fn from_decimal_proto(value: &proto::Decimal) -> Decimal {
    Decimal::from_str(&value.value).unwrap_or(Decimal::ZERO)
}

pub fn to_instant_proto(dt: DateTime<Utc>) -> proto::Instant {
    proto::Instant {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

pub fn from_instant_proto(instant: &proto::Instant) -> Option<DateTime<Utc>> {
    normalize_timestamp(&RawTimestamp::SecondsNanos {
        seconds: instant.seconds,
        nanos: instant.nanos.max(0) as u32,
    })
}

pub fn side_to_proto(side: SignalSide) -> proto::Side {
    match side {
        SignalSide::Long => proto::Side::SideLong,
        SignalSide::Short => proto::Side::SideShort,
        SignalSide::Flat => proto::Side::SideFlat,
    }
}

pub fn side_from_proto(side: i32) -> SignalSide {
    match proto::Side::try_from(side).unwrap_or(proto::Side::SideUnspecified) {
        proto::Side::SideLong => SignalSide::Long,
        proto::Side::SideShort => SignalSide::Short,
        _ => SignalSide::Flat,
    }
}

pub fn mode_to_proto(mode: TradingMode) -> proto::Mode {
    match mode {
        TradingMode::Paper => proto::Mode::Paper,
        TradingMode::Live => proto::Mode::Live,
    }
}

/// Converts a catalog candle into the wire `OHLC` message (used only by
/// test-injection paths; production candles arrive already as `proto::OHLC`
/// from the upstream `MarketDataService`).
impl From<Candle> for proto::OHLC {
    fn from(candle: Candle) -> Self {
        proto::OHLC {
            symbol: candle.symbol,
            timeframe: candle.timeframe,
            timestamp: candle.timestamp.map(to_instant_proto),
            open: Some(to_decimal_proto(candle.open)),
            high: Some(to_decimal_proto(candle.high)),
            low: Some(to_decimal_proto(candle.low)),
            close: Some(to_decimal_proto(candle.close)),
            volume: Some(to_decimal_proto(candle.volume)),
            count: candle.count,
            trace: None,
        }
    }
}

/// Converts a wire `OHLC` message into a `Candle`, normalizing its
/// timestamp. A missing or unparseable timestamp becomes `timestamp: None`
/// rather than dropping the candle — per §4.5 gate 2 ("Unparseable -> treat
/// as `null` (skip gates 3-5 that require a ts)") the candle still routes
/// through the engine, it just skips the gates that need a timestamp.
pub fn ohlc_from_proto(ohlc: &proto::OHLC) -> Candle {
    let timestamp = ohlc.timestamp.as_ref().and_then(from_instant_proto);
    Candle {
        symbol: ohlc.symbol.clone(),
        timeframe: ohlc.timeframe.clone(),
        timestamp,
        open: ohlc.open.as_ref().map(from_decimal_proto).unwrap_or_default(),
        high: ohlc.high.as_ref().map(from_decimal_proto).unwrap_or_default(),
        low: ohlc.low.as_ref().map(from_decimal_proto).unwrap_or_default(),
        close: ohlc.close.as_ref().map(from_decimal_proto).unwrap_or_default(),
        volume: ohlc.volume.as_ref().map(from_decimal_proto).unwrap_or_default(),
        count: ohlc.count,
    }
}

pub fn trace_from_signal(signal: &Signal, source_service: &str, latency_ms: i64) -> proto::TraceContext {
    proto::TraceContext {
        correlation_id: signal.correlation_id.to_string(),
        idempotency_key: signal.idempotency_key.to_string(),
        source_service: source_service.to_string(),
        latency_ms,
        timestamp: Some(to_instant_proto(Utc::now())),
    }
}

impl From<&Signal> for proto::TradeSignal {
    fn from(signal: &Signal) -> Self {
        proto::TradeSignal {
            side: side_to_proto(signal.side) as i32,
            price: Some(to_decimal_proto(signal.price)),
            confidence: signal.confidence,
            meta: signal.meta.clone(),
            strategy_id: signal.strategy_id.clone(),
            strategy_version: signal.strategy_version.clone(),
            symbol: signal.symbol.clone(),
            timeframe: signal.timeframe.clone(),
            trace: Some(trace_from_signal(signal, "signal-service", 0)),
        }
    }
}

impl From<&proto::TradeSignal> for Signal {
    fn from(wire: &proto::TradeSignal) -> Self {
        let (idempotency_key, correlation_id) = wire
            .trace
            .as_ref()
            .map(|trace| {
                (
                    Uuid::from_str(&trace.idempotency_key).unwrap_or_else(|_| Uuid::new_v4()),
                    Uuid::from_str(&trace.correlation_id).unwrap_or_else(|_| Uuid::new_v4()),
                )
            })
            .unwrap_or_else(|| (Uuid::new_v4(), Uuid::new_v4()));

        Signal {
            side: side_from_proto(wire.side),
            price: wire.price.as_ref().map(from_decimal_proto).unwrap_or_default(),
            confidence: wire.confidence,
            meta: wire.meta.clone(),
            strategy_id: wire.strategy_id.clone(),
            strategy_version: wire.strategy_version.clone(),
            symbol: wire.symbol.clone(),
            timeframe: wire.timeframe.clone(),
            idempotency_key,
            correlation_id,
        }
    }
}

/// Translates an emitted signal into the `OrderRequest` envelope C6 sends
/// downstream (4.6): missing price means a market order, otherwise limit;
/// `source_service` is always `"signal-service"`.
pub fn signal_to_order_request(signal: &Signal, mode: TradingMode, size: Decimal) -> proto::OrderRequest {
    let order_type = if signal.price.is_zero() {
        proto::OrderType::OrderTypeMarket
    } else {
        proto::OrderType::OrderTypeLimit
    };

    proto::OrderRequest {
        signal_id: signal.idempotency_key.to_string(),
        strategy_id: signal.strategy_id.clone(),
        strategy_version: signal.strategy_version.clone(),
        symbol: signal.symbol.clone(),
        side: side_to_proto(signal.side) as i32,
        size: Some(to_decimal_proto(size)),
        price: Some(to_decimal_proto(signal.price)),
        order_type: order_type as i32,
        mode: mode_to_proto(mode) as i32,
        risk_checks: Default::default(),
        trace: Some(trace_from_signal(signal, "signal-service", 0)),
    }
}
