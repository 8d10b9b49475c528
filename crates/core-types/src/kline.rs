// In crates/core-types/src/kline.rs

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV candle. Times are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: i64,
}

impl Kline {
    /// The open time as a UTC timestamp, if it is within chrono's range.
    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.open_time).single()
    }

    /// The UTC calendar date the candle opened on.
    pub fn open_date(&self) -> Option<NaiveDate> {
        self.open_datetime().map(|dt| dt.date_naive())
    }

    fn check(&self, index: usize) -> Result<()> {
        let malformed = |reason: &str| Error::MalformedKline {
            index,
            reason: reason.to_string(),
        };

        if self.open <= Decimal::ZERO
            || self.high <= Decimal::ZERO
            || self.low <= Decimal::ZERO
            || self.close <= Decimal::ZERO
        {
            return Err(malformed("prices must be strictly positive"));
        }
        if self.volume < Decimal::ZERO {
            return Err(malformed("volume must not be negative"));
        }
        if self.low > self.high {
            return Err(malformed("low is above high"));
        }
        if self.open < self.low || self.open > self.high {
            return Err(malformed("open is outside the low/high range"));
        }
        if self.close < self.low || self.close > self.high {
            return Err(malformed("close is outside the low/high range"));
        }
        if self.open_datetime().is_none() {
            return Err(malformed("open time is not a valid timestamp"));
        }
        Ok(())
    }
}

/// An ordered, validated sequence of klines.
///
/// Construction guarantees ascending, unique open times and internally consistent
/// OHLC values, so downstream consumers never have to re-check them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleSeries {
    klines: Vec<Kline>,
}

impl CandleSeries {
    pub fn new(klines: Vec<Kline>) -> Result<Self> {
        for (index, kline) in klines.iter().enumerate() {
            kline.check(index)?;
            if index > 0 {
                let previous = klines[index - 1].open_time;
                if kline.open_time <= previous {
                    return Err(Error::OutOfOrder {
                        index,
                        previous,
                        current: kline.open_time,
                    });
                }
            }
        }
        Ok(Self { klines })
    }

    pub fn klines(&self) -> &[Kline] {
        &self.klines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Kline> {
        self.klines.iter()
    }

    pub fn len(&self) -> usize {
        self.klines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.klines.is_empty()
    }

    pub fn first(&self) -> Option<&Kline> {
        self.klines.first()
    }

    pub fn last(&self) -> Option<&Kline> {
        self.klines.last()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Kline;
    type IntoIter = std::slice::Iter<'a, Kline>;

    fn into_iter(self) -> Self::IntoIter {
        self.klines.iter()
    }
}
