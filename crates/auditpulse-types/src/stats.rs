//! Display arithmetic for the dashboard and settings views.

use crate::audit::Audit;
use crate::billing::Subscription;

/// Share of the monthly allowance already used, capped at 100.
pub fn usage_percent(sub: &Subscription) -> f64 {
    if sub.audits_per_month == 0 {
        return 0.0;
    }
    let pct = f64::from(sub.audits_used_this_month) / f64::from(sub.audits_per_month) * 100.0;
    pct.min(100.0)
}

/// Rounded mean overall score. Audits without a score (or scoring 0) are skipped.
pub fn average_score(audits: &[Audit]) -> Option<u32> {
    let scores: Vec<u32> = audits
        .iter()
        .filter_map(|a| a.overall_score)
        .filter(|&s| s > 0)
        .map(u32::from)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let total: u32 = scores.iter().sum();
    Some((f64::from(total) / scores.len() as f64).round() as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

pub fn score_band(score: u8) -> ScoreBand {
    match score {
        80.. => ScoreBand::Good,
        50..=79 => ScoreBand::Fair,
        _ => ScoreBand::Poor,
    }
}

/// Offset/limit window over the audit list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;

    /// Zero-based page number with the default page size.
    pub fn number(page: u32) -> Self {
        Self {
            skip: page.saturating_mul(Self::DEFAULT_LIMIT),
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn next(self) -> Self {
        Self {
            skip: self.skip.saturating_add(self.limit),
            ..self
        }
    }

    pub fn prev(self) -> Self {
        Self {
            skip: self.skip.saturating_sub(self.limit),
            ..self
        }
    }

    /// A full page suggests there may be more rows after it.
    pub fn has_more(self, returned: usize) -> bool {
        returned as u64 >= u64::from(self.limit)
    }
}
