//! Transaction statistics and groupings for the dashboard charts.
//!
//! Every function here is pure: it borrows the transactions and returns a
//! new derived value. Nothing is cached, the views are recomputed whenever
//! the dashboard is rendered.

use std::collections::{BTreeMap, HashMap};

use time::{Date, OffsetDateTime, UtcOffset};

use crate::transaction::Transaction;

/// Summary statistics over a collection of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryStats {
    /// The number of transactions.
    pub total_transactions: usize,
    /// The sum of all amounts.
    pub total_amount: f64,
    /// The sum of the amounts of fraudulent transactions.
    pub fraud_amount: f64,
    /// The number of fraudulent transactions.
    pub fraud_count: usize,
    /// The percentage of transactions that are fraudulent, in [0, 100].
    pub fraud_rate: f64,
    /// The mean amount per transaction.
    pub average_amount: f64,
}

impl SummaryStats {
    /// The number of transactions not classified as fraud.
    pub fn legitimate_count(&self) -> usize {
        self.total_transactions - self.fraud_count
    }
}

/// Compute the summary statistics for `transactions`.
///
/// Negative, missing or NaN amounts count as zero. An empty slice gives
/// all-zero statistics.
pub fn summarize(transactions: &[Transaction]) -> SummaryStats {
    let mut stats = SummaryStats {
        total_transactions: transactions.len(),
        ..Default::default()
    };

    for transaction in transactions {
        let amount = transaction.effective_amount();
        stats.total_amount += amount;

        if transaction.is_fraud {
            stats.fraud_amount += amount;
            stats.fraud_count += 1;
        }
    }

    if stats.total_transactions > 0 {
        let count = stats.total_transactions as f64;
        stats.fraud_rate = stats.fraud_count as f64 / count * 100.0;
        stats.average_amount = stats.total_amount / count;
    }

    stats
}

/// The transaction field to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Location,
    Device,
}

impl GroupField {
    fn value(self, transaction: &Transaction) -> &str {
        match self {
            GroupField::Location => &transaction.location,
            GroupField::Device => &transaction.device,
        }
    }
}

/// The number of transactions that share a value of a [GroupField].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    pub name: String,
    pub count: usize,
}

/// Count transactions by the exact value of `field`.
///
/// Groups are returned in the order their value is first seen.
pub fn group_by(transactions: &[Transaction], field: GroupField) -> Vec<GroupCount> {
    let mut groups: Vec<GroupCount> = Vec::new();
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();

    for transaction in transactions {
        let name = field.value(transaction);

        match index_by_name.get(name) {
            Some(&index) => groups[index].count += 1,
            None => {
                index_by_name.insert(name, groups.len());
                groups.push(GroupCount {
                    name: name.to_owned(),
                    count: 1,
                });
            }
        }
    }

    groups
}

/// The number of transactions on one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyVolume {
    pub date: Date,
    pub total: usize,
    pub fraudulent: usize,
}

/// Bucket transactions by their calendar date in the timezone `local_offset`.
///
/// Days are returned in chronological order and days without transactions
/// are omitted.
pub fn daily_volume(transactions: &[Transaction], local_offset: UtcOffset) -> Vec<DailyVolume> {
    let mut volume_by_date: BTreeMap<Date, DailyVolume> = BTreeMap::new();

    for transaction in transactions {
        let date = transaction.local_date(local_offset);
        let volume = volume_by_date.entry(date).or_insert(DailyVolume {
            date,
            total: 0,
            fraudulent: 0,
        });

        volume.total += 1;
        if transaction.is_fraud {
            volume.fraudulent += 1;
        }
    }

    volume_by_date.into_values().collect()
}

/// A bucket of the anomaly score histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Every risk level from lowest to highest.
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::VeryLow,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::VeryHigh,
    ];

    /// Get the bucket for `score`. Each bucket includes its upper bound.
    ///
    /// NaN is treated as a score of zero.
    pub fn from_score(score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score };

        if score <= -0.6 {
            RiskLevel::VeryLow
        } else if score <= -0.2 {
            RiskLevel::Low
        } else if score <= 0.2 {
            RiskLevel::Medium
        } else if score <= 0.6 {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "Very Low Risk (-1.0 to -0.6)",
            RiskLevel::Low => "Low Risk (-0.6 to -0.2)",
            RiskLevel::Medium => "Medium Risk (-0.2 to 0.2)",
            RiskLevel::High => "High Risk (0.2 to 0.6)",
            RiskLevel::VeryHigh => "Very High Risk (0.6 to 1.0)",
        }
    }

    fn index(self) -> usize {
        match self {
            RiskLevel::VeryLow => 0,
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::VeryHigh => 4,
        }
    }
}

/// The number of transactions in one [RiskLevel].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskBin {
    pub level: RiskLevel,
    pub count: usize,
}

/// Count transactions per risk level.
///
/// All five bins are always returned, ordered from lowest to highest risk.
pub fn risk_histogram(transactions: &[Transaction]) -> [RiskBin; 5] {
    let mut bins = RiskLevel::ALL.map(|level| RiskBin { level, count: 0 });

    for transaction in transactions {
        bins[RiskLevel::from_score(transaction.anomaly_score).index()].count += 1;
    }

    bins
}

/// One point of the transaction trend chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub time: OffsetDateTime,
    pub amount: f64,
}

/// The time and amount of the last `count` transactions in `transactions`.
pub fn recent_trend(transactions: &[Transaction], count: usize) -> Vec<TrendPoint> {
    let start = transactions.len().saturating_sub(count);

    transactions[start..]
        .iter()
        .map(|transaction| TrendPoint {
            time: transaction.time,
            amount: transaction.effective_amount(),
        })
        .collect()
}
