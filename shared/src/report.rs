use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{BakeryError, BakeryResult, OrderStatus};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Strict `YYYY-MM-DD` parsing; chrono alone would also accept unpadded fields.
pub fn parse_date(raw: &str) -> BakeryResult<NaiveDate> {
    let raw = raw.trim();
    let well_formed = raw.len() == 10
        && raw.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        });
    if !well_formed {
        return Err(BakeryError::invalid_input(format!(
            "invalid date '{}', expected YYYY-MM-DD",
            raw
        )));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| BakeryError::invalid_input(format!("invalid date '{}': {}", raw, e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "Daily",
            ReportPeriod::Weekly => "Weekly",
            ReportPeriod::Monthly => "Monthly",
        }
    }

    fn lookback_days(&self) -> i64 {
        match self {
            ReportPeriod::Daily => 0,
            ReportPeriod::Weekly => 7,
            ReportPeriod::Monthly => 30,
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = BakeryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ReportPeriod::Daily),
            "weekly" => Ok(ReportPeriod::Weekly),
            "monthly" => Ok(ReportPeriod::Monthly),
            other => Err(BakeryError::invalid_input(format!("unknown report period '{}'", other))),
        }
    }
}

/// Inclusive calendar-date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> BakeryResult<Self> {
        if start > end {
            return Err(BakeryError::invalid_input(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self {
            start,
            end,
            label: "Custom".to_string(),
        })
    }

    pub fn parse(start: &str, end: &str) -> BakeryResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn for_period(period: ReportPeriod, today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(period.lookback_days()),
            end: today,
            label: period.label().to_string(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularItem {
    pub cake_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub revenue: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub range: DateRange,
    pub total_orders: usize,
    pub total_revenue: BigDecimal,
    pub avg_order_value: BigDecimal,
    pub status_counts: BTreeMap<OrderStatus, usize>,
    pub popular_items: Vec<PopularItem>,
}

impl ReportSummary {
    pub fn empty(range: DateRange) -> Self {
        Self {
            range,
            total_orders: 0,
            total_revenue: BigDecimal::zero(),
            avg_order_value: BigDecimal::zero(),
            status_counts: BTreeMap::new(),
            popular_items: Vec::new(),
        }
    }
}

const RENDERED_TOP_ITEMS: usize = 5;

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} Report ({} to {})",
            self.range.label,
            self.range.start.format(DATE_FORMAT),
            self.range.end.format(DATE_FORMAT)
        )?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f)?;
        writeln!(f, "Total Orders: {}", self.total_orders)?;
        writeln!(f, "Total Revenue: ${}", self.total_revenue.with_scale(2))?;
        writeln!(f, "Average Order Value: ${}", self.avg_order_value.with_scale(2))?;
        writeln!(f)?;
        writeln!(f, "Order Status Breakdown:")?;
        for (status, count) in &self.status_counts {
            writeln!(f, "  {}: {}", capitalize(status.as_str()), count)?;
        }
        if !self.popular_items.is_empty() {
            writeln!(f)?;
            writeln!(f, "Most Popular Items:")?;
            for item in self.popular_items.iter().take(RENDERED_TOP_ITEMS) {
                writeln!(
                    f,
                    "  {}: {} sold, ${}",
                    item.name,
                    item.quantity,
                    item.revenue.with_scale(2)
                )?;
            }
        }
        Ok(())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub today_orders: usize,
    pub today_revenue: BigDecimal,
    pub available_cakes: usize,
    pub low_stock_items: usize,
}
