//! Deterministic channel budget allocation.
//!
//! Equal split with remainder to the first channels, then a modest shift
//! toward the channel that converted best last time. Also hosts the exact-sum
//! helpers the strategy step uses on model-produced splits.

use indexmap::IndexMap;

/// Channel name to whole-rupee amount, in channel order.
pub type BudgetSplit = IndexMap<String, i64>;

const HIGH_ROI_PHRASE: &str = "had the highest Conversion Rate";

/// First channel holding the largest amount.
fn largest_channel(split: &BudgetSplit) -> Option<&str> {
    let mut best: Option<(&str, i64)> = None;
    for (name, &amount) in split {
        match best {
            Some((_, top)) if amount <= top => {}
            _ => best = Some((name.as_str(), amount)),
        }
    }
    best.map(|(name, _)| name)
}

/// Add `total - sum` to the largest channel. Returns the channel and the
/// change applied, or `None` when the split already sums to `total`.
///
/// Sums in `i128`; a target pushed past the `i64` range saturates, which only
/// happens on the way below zero and is then clamped by the caller.
pub fn correct_to_total(split: &mut BudgetSplit, total: i64) -> Option<(String, i64)> {
    let sum: i128 = split.values().map(|v| i128::from(*v)).sum();
    let diff = i128::from(total) - sum;
    if diff == 0 {
        return None;
    }
    let target = largest_channel(split)?.to_string();
    let amount = split.get_mut(&target)?;
    let corrected = saturate(i128::from(*amount) + diff);
    let applied = saturate(i128::from(corrected) - i128::from(*amount));
    *amount = corrected;
    Some((target, applied))
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Zero every negative amount. Returns whether anything changed.
pub fn clamp_negatives(split: &mut BudgetSplit) -> bool {
    let mut clamped = false;
    for amount in split.values_mut() {
        if *amount < 0 {
            *amount = 0;
            clamped = true;
        }
    }
    clamped
}

/// Channel from `recommended` named just before the high-ROI phrase in the
/// history text, matched by substring.
pub fn high_roi_channel<'a>(history: &str, recommended: &'a [String]) -> Option<&'a str> {
    let (before, _) = history.split_once(HIGH_ROI_PHRASE)?;
    let candidate = before.split_whitespace().last()?;
    recommended
        .iter()
        .find(|channel| channel.contains(candidate))
        .map(String::as_str)
}

/// Split `total` across `channels` using last campaign's results.
///
/// Every amount is non-negative and the amounts sum to `total`. Returns an
/// empty split when there are no channels or no budget. Duplicate channel
/// names are merged, keeping the first position.
pub fn allocate_budget(total: i64, channels: &[String], history: &str) -> BudgetSplit {
    let mut unique: Vec<String> = Vec::with_capacity(channels.len());
    for c in channels {
        if !unique.contains(c) {
            unique.push(c.clone());
        }
    }
    if unique.is_empty() || total <= 0 {
        tracing::debug!(total, "nothing to allocate");
        return BudgetSplit::new();
    }

    let n = unique.len() as i64;
    let base = total / n;
    let remainder = total % n;
    let mut split: BudgetSplit = unique
        .iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), base + i64::from((i as i64) < remainder)))
        .collect();

    if let Some(boosted) = high_roi_channel(history, &unique).filter(|_| n > 1) {
        tracing::debug!(channel = boosted, "boosting high-ROI channel");
        let own = split.get(boosted).copied().unwrap_or(0);
        let boost = (own / 5).min(base / 2);
        let other_total = total - own;

        if other_total > 0 {
            let reductions: Vec<(String, i64)> = split
                .iter()
                .filter(|(name, _)| name.as_str() != boosted)
                .map(|(name, &amount)| {
                    let amount = i128::from(amount);
                    let proportional = i128::from(boost) * amount / i128::from(other_total);
                    let reduction = proportional.min(amount * 3 / 10);
                    (name.clone(), saturate(reduction))
                })
                .collect();
            let collected: i64 = reductions.iter().map(|(_, r)| r).sum();

            if collected > 0 {
                for (name, reduction) in &reductions {
                    if let Some(amount) = split.get_mut(name) {
                        *amount -= reduction;
                    }
                }
                if let Some(amount) = split.get_mut(boosted) {
                    *amount += collected;
                }
            }
        }
    }

    if let Some((channel, diff)) = correct_to_total(&mut split, total) {
        tracing::debug!(%channel, diff, "final allocation adjustment");
    }
    clamp_negatives(&mut split);
    correct_to_total(&mut split, total);

    split
}
