use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::domain::quote::validate_positive;
use crate::ValidationError;

/// Number of daily points in every price history.
pub const SERIES_LEN: usize = 30;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// One daily closing price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    #[serde(serialize_with = "serialize_date", deserialize_with = "deserialize_date")]
    pub date: Date,
    pub price: f64,
    /// Midnight UTC of `date`, seconds since the Unix epoch.
    pub timestamp_epoch: i64,
}

impl ChartPoint {
    pub fn new(date: Date, price: f64) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;
        Ok(Self {
            date,
            price,
            timestamp_epoch: date.midnight().assume_utc().unix_timestamp(),
        })
    }
}

/// Exactly [`SERIES_LEN`] points, strictly increasing by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChartPoint>", into = "Vec<ChartPoint>")]
pub struct PriceSeries(Vec<ChartPoint>);

impl PriceSeries {
    pub fn new(points: Vec<ChartPoint>) -> Result<Self, ValidationError> {
        if points.len() != SERIES_LEN {
            return Err(ValidationError::ChartLength {
                expected: SERIES_LEN,
                actual: points.len(),
            });
        }
        if !points.windows(2).all(|pair| pair[0].date < pair[1].date) {
            return Err(ValidationError::ChartOrder);
        }
        Ok(Self(points))
    }

    pub fn points(&self) -> &[ChartPoint] {
        &self.0
    }

    pub fn last(&self) -> &ChartPoint {
        &self.0[SERIES_LEN - 1]
    }
}

impl TryFrom<Vec<ChartPoint>> for PriceSeries {
    type Error = ValidationError;

    fn try_from(value: Vec<ChartPoint>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PriceSeries> for Vec<ChartPoint> {
    fn from(value: PriceSeries) -> Self {
        value.0
    }
}

pub(crate) fn parse_date(input: &str) -> Option<Date> {
    Date::parse(input.trim(), DATE_FORMAT).ok()
}

fn serialize_date<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = date
        .format(DATE_FORMAT)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_date(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, Month};

    fn date(day: u8) -> Date {
        Date::from_calendar_date(2024, Month::March, day).expect("date")
    }

    fn points(count: usize) -> Vec<ChartPoint> {
        (0..count)
            .map(|offset| {
                ChartPoint::new(date(1) + Duration::days(offset as i64), 10.0).expect("point")
            })
            .collect()
    }

    #[test]
    fn point_timestamp_is_utc_midnight() {
        let point = ChartPoint::new(date(1), 12.5).expect("point");
        assert_eq!(point.timestamp_epoch, 1_709_251_200);
    }

    #[test]
    fn series_requires_exact_length_and_order() {
        assert!(PriceSeries::new(points(SERIES_LEN)).is_ok());
        assert_eq!(
            PriceSeries::new(points(29)),
            Err(ValidationError::ChartLength {
                expected: SERIES_LEN,
                actual: 29
            })
        );

        let mut shuffled = points(SERIES_LEN);
        shuffled.swap(3, 4);
        assert_eq!(PriceSeries::new(shuffled), Err(ValidationError::ChartOrder));
    }

    #[test]
    fn point_serializes_iso_date() {
        let point = ChartPoint::new(date(5), 1.0).expect("point");
        let value = serde_json::to_value(&point).expect("serialize");
        assert_eq!(value["date"], serde_json::json!("2024-03-05"));
    }
}
