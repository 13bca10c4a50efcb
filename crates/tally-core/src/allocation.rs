//! Proportional cost-splitting engine
//!
//! Pure integer arithmetic, no floating point: an item's total is divided
//! across its consumers by part weights using the largest-remainder method,
//! so the shares always sum to exactly `price * quantity`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Consumer, ReceiptItem, UserId};

/// One consumer's share of a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedShare {
    /// Exact share in currency subunits
    pub amount_subunits: i64,
    /// True when this share was rounded up by one subunit at the expense of
    /// perfect proportionality
    pub has_shortage: bool,
}

/// Split `price_subunits * quantity` across consumers by part weights.
///
/// Each consumer first receives the floor of their proportional share; the
/// remaining subunits (always fewer than the number of consumers) go one
/// each to the consumers with the largest fractional remainder, ties broken
/// by ascending user id. Consumers that received an extra subunit are
/// flagged `has_shortage`.
pub fn allocate(
    price_subunits: i64,
    quantity: i64,
    consumer_parts: &BTreeMap<UserId, i64>,
) -> Result<BTreeMap<UserId, AllocatedShare>> {
    if price_subunits < 0 {
        return Err(Error::InvalidAllocation(format!(
            "negative price: {price_subunits}"
        )));
    }
    if quantity < 0 {
        return Err(Error::InvalidAllocation(format!(
            "negative quantity: {quantity}"
        )));
    }
    if let Some((user, part)) = consumer_parts.iter().find(|(_, part)| **part <= 0) {
        return Err(Error::InvalidAllocation(format!(
            "part {part} for user {user} must be positive"
        )));
    }

    let total_parts: i128 = consumer_parts.values().map(|part| i128::from(*part)).sum();
    if total_parts == 0 {
        return Err(Error::InvalidAllocation("zero total parts".to_string()));
    }

    let total = i128::from(price_subunits) * i128::from(quantity);

    // Floor shares plus each consumer's fractional remainder. BTreeMap
    // iteration is ascending by user id, which fixes the tie-break order.
    let mut shares: Vec<(UserId, i64, i128)> = consumer_parts
        .iter()
        .map(|(user, part)| {
            let scaled = total.checked_mul(i128::from(*part)).ok_or_else(|| {
                Error::InvalidAllocation(format!("share overflow for user {user}"))
            })?;
            let floor = i64::try_from(scaled / total_parts).map_err(|_| {
                Error::InvalidAllocation(format!("share overflow for user {user}"))
            })?;
            Ok((user.clone(), floor, scaled % total_parts))
        })
        .collect::<Result<Vec<_>>>()?;

    let floored: i128 = shares.iter().map(|(_, floor, _)| i128::from(*floor)).sum();
    let mut remainder = total - floored;

    // Stable sort keeps the ascending-user order among equal remainders
    shares.sort_by(|a, b| b.2.cmp(&a.2));

    let mut result = BTreeMap::new();
    for (user, floor, _) in shares {
        let extra = remainder > 0;
        if extra {
            remainder -= 1;
        }
        result.insert(
            user,
            AllocatedShare {
                amount_subunits: floor + i64::from(extra),
                has_shortage: extra,
            },
        );
    }

    let allocated: i128 = result
        .values()
        .map(|share| i128::from(share.amount_subunits))
        .sum();
    if allocated != total {
        return Err(Error::InternalInvariant(format!(
            "allocation sum {allocated} != item total {total}"
        )));
    }

    Ok(result)
}

/// A user's aggregated position on one receipt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSum {
    /// Subunits this user owes for what they consumed
    pub debt_sum_subunits: i64,
    /// Subunits this user paid on the receipt
    pub pay_sum_subunits: i64,
}

impl ParticipantSum {
    /// Net obligation toward the payer; negative means the user is owed
    #[must_use]
    pub const fn net_subunits(&self) -> i64 {
        self.debt_sum_subunits - self.pay_sum_subunits
    }
}

/// Per-user aggregated positions for a whole receipt
pub type ParticipantSums = BTreeMap<UserId, ParticipantSum>;

/// Aggregate every item's allocation into per-user debt and pay sums.
///
/// `payer` receives the full item total on the pay side for every item
/// (the receipt owner settles the bill). Items nobody consumes still count
/// toward the payer's pay sum but produce no debt.
pub fn receipt_sums(
    items: &[ReceiptItem],
    consumers: &[Consumer],
    payer: Option<&UserId>,
) -> Result<ParticipantSums> {
    let mut by_item: BTreeMap<_, BTreeMap<UserId, i64>> = BTreeMap::new();
    for consumer in consumers {
        by_item
            .entry(consumer.item_id)
            .or_default()
            .insert(consumer.user_id.clone(), consumer.part);
    }

    let mut sums = ParticipantSums::new();

    for item in items {
        let total = i128::from(item.price_subunits) * i128::from(item.quantity);
        let total = i64::try_from(total).map_err(|_| {
            Error::InvalidAllocation(format!("item {} total overflows", item.id))
        })?;

        if let Some(payer) = payer {
            let entry = sums.entry(payer.clone()).or_default();
            entry.pay_sum_subunits = entry
                .pay_sum_subunits
                .checked_add(total)
                .ok_or_else(|| Error::InvalidAllocation("pay sum overflows".to_string()))?;
        }

        let Some(parts) = by_item.get(&item.id) else {
            continue;
        };

        for (user, share) in allocate(item.price_subunits, item.quantity, parts)? {
            let entry = sums.entry(user).or_default();
            entry.debt_sum_subunits = entry
                .debt_sum_subunits
                .checked_add(share.amount_subunits)
                .ok_or_else(|| Error::InvalidAllocation("debt sum overflows".to_string()))?;
        }
    }

    Ok(sums)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, ReceiptId};
    use pretty_assertions::assert_eq;

    fn parts(entries: &[(&str, i64)]) -> BTreeMap<UserId, i64> {
        entries
            .iter()
            .map(|(user, part)| (UserId::from(*user), *part))
            .collect()
    }

    #[test]
    fn test_exact_proportional_split() {
        // price 300, quantity 1, parts {A:1, B:2} -> {A: 100, B: 200}
        let shares = allocate(300, 1, &parts(&[("a", 1), ("b", 2)])).unwrap();

        assert_eq!(shares[&UserId::from("a")].amount_subunits, 100);
        assert_eq!(shares[&UserId::from("b")].amount_subunits, 200);
        assert!(!shares[&UserId::from("a")].has_shortage);
        assert!(!shares[&UserId::from("b")].has_shortage);
    }

    #[test]
    fn test_remainder_goes_to_exactly_one_consumer() {
        // 100 across three equal parts: 34 + 33 + 33
        let shares = allocate(100, 1, &parts(&[("a", 1), ("b", 1), ("c", 1)])).unwrap();

        let total: i64 = shares.values().map(|s| s.amount_subunits).sum();
        assert_eq!(total, 100);

        let flagged: Vec<_> = shares
            .iter()
            .filter(|(_, share)| share.has_shortage)
            .map(|(user, _)| user.clone())
            .collect();
        assert_eq!(flagged, vec![UserId::from("a")]); // equal remainders, lowest id wins
        assert_eq!(shares[&UserId::from("a")].amount_subunits, 34);
    }

    #[test]
    fn test_largest_remainder_wins() {
        // total 10, parts {a:1, b:2}: floors 3/6, remainders 1/2 -> b gets the extra
        let shares = allocate(10, 1, &parts(&[("a", 1), ("b", 2)])).unwrap();

        assert_eq!(shares[&UserId::from("a")].amount_subunits, 3);
        assert_eq!(shares[&UserId::from("b")].amount_subunits, 7);
        assert!(shares[&UserId::from("b")].has_shortage);
        assert!(!shares[&UserId::from("a")].has_shortage);
    }

    #[test]
    fn test_quantity_multiplies_total() {
        let shares = allocate(150, 2, &parts(&[("a", 1), ("b", 1)])).unwrap();
        assert_eq!(shares[&UserId::from("a")].amount_subunits, 150);
        assert_eq!(shares[&UserId::from("b")].amount_subunits, 150);
    }

    #[test]
    fn test_conservation_and_shortage_bound() {
        // Conservation must hold for every shape, and nobody ever gets more
        // than one extra subunit above their floor share.
        let cases: &[(i64, i64, &[(&str, i64)])] = &[
            (1, 1, &[("a", 1), ("b", 1), ("c", 1)]),
            (97, 3, &[("a", 2), ("b", 5), ("c", 7)]),
            (999, 1, &[("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1), ("f", 1), ("g", 1)]),
            (12_345, 7, &[("a", 3), ("b", 11)]),
            (0, 5, &[("a", 1), ("b", 9)]),
        ];

        for (price, quantity, entries) in cases {
            let map = parts(entries);
            let total_parts: i64 = map.values().sum();
            let total = price * quantity;

            let shares = allocate(*price, *quantity, &map).unwrap();

            let sum: i64 = shares.values().map(|s| s.amount_subunits).sum();
            assert_eq!(sum, total, "conservation for {price}x{quantity}");

            // One extra subunit per flag, so the flags account for exactly
            // the gap between the total and the floor shares
            let mut floor_sum: i64 = 0;
            for (user, share) in &shares {
                let floor = (i128::from(total) * i128::from(map[user]) / i128::from(total_parts))
                    as i64;
                floor_sum += floor;
                assert!(share.amount_subunits >= floor);
                assert!(share.amount_subunits <= floor + 1);
                assert_eq!(share.has_shortage, share.amount_subunits == floor + 1);
            }

            let extras = shares.values().filter(|s| s.has_shortage).count() as i64;
            assert_eq!(extras, total - floor_sum, "distributed remainder");
        }
    }

    #[test]
    fn test_equal_parts_remainder_is_total_mod_consumers() {
        // With uniform weights every floor share is total / n, so the
        // number of rounded-up consumers collapses to total mod n
        let cases: &[(i64, i64, &[(&str, i64)])] = &[
            (1, 1, &[("a", 1), ("b", 1), ("c", 1)]),
            (100, 1, &[("a", 1), ("b", 1), ("c", 1)]),
            (999, 1, &[("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1), ("f", 1), ("g", 1)]),
            (7, 3, &[("a", 1), ("b", 1)]),
        ];

        for (price, quantity, entries) in cases {
            let map = parts(entries);
            let total_parts: i64 = map.values().sum();
            let total = price * quantity;

            let shares = allocate(*price, *quantity, &map).unwrap();
            let extras = shares.values().filter(|s| s.has_shortage).count() as i64;
            assert_eq!(extras, total % total_parts, "remainder for {price}x{quantity}");
        }
    }

    #[test]
    fn test_single_consumer_takes_all() {
        let shares = allocate(101, 3, &parts(&[("a", 5)])).unwrap();
        assert_eq!(shares[&UserId::from("a")].amount_subunits, 303);
        assert!(!shares[&UserId::from("a")].has_shortage);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            allocate(-1, 1, &parts(&[("a", 1)])),
            Err(Error::InvalidAllocation(_))
        ));
        assert!(matches!(
            allocate(100, -2, &parts(&[("a", 1)])),
            Err(Error::InvalidAllocation(_))
        ));
        assert!(matches!(
            allocate(100, 1, &parts(&[("a", 0)])),
            Err(Error::InvalidAllocation(_))
        ));
        assert!(matches!(
            allocate(100, 1, &parts(&[("a", -3)])),
            Err(Error::InvalidAllocation(_))
        ));
        assert!(matches!(
            allocate(100, 1, &BTreeMap::new()),
            Err(Error::InvalidAllocation(_))
        ));
    }

    #[test]
    fn test_extreme_inputs_error_instead_of_overflowing() {
        // Type-valid but absurd magnitudes must surface as input errors,
        // never as arithmetic panics
        // i128 scaling overflow
        let result = allocate(i64::MAX, i64::MAX, &parts(&[("a", i64::MAX), ("b", 1)]));
        assert!(matches!(result, Err(Error::InvalidAllocation(_))));

        // Share exceeds i64 after division
        let result = allocate(i64::MAX, 2, &parts(&[("a", 1)]));
        assert!(matches!(result, Err(Error::InvalidAllocation(_))));
    }

    fn item(receipt: ReceiptId, price: i64, quantity: i64) -> ReceiptItem {
        ReceiptItem::new(receipt, price, quantity)
    }

    fn consumer(item_id: ItemId, user: &str, part: i64) -> Consumer {
        Consumer {
            item_id,
            user_id: UserId::from(user),
            part,
        }
    }

    #[test]
    fn test_receipt_sums_nets_against_payer() {
        let receipt = ReceiptId::new();
        let pizza = item(receipt, 300, 1);
        let wine = item(receipt, 100, 1);
        let items = vec![pizza.clone(), wine.clone()];
        let consumers = vec![
            consumer(pizza.id, "alice", 1),
            consumer(pizza.id, "bob", 2),
            consumer(wine.id, "bob", 1),
        ];

        let payer = UserId::from("alice");
        let sums = receipt_sums(&items, &consumers, Some(&payer)).unwrap();

        let alice = sums[&UserId::from("alice")];
        assert_eq!(alice.debt_sum_subunits, 100);
        assert_eq!(alice.pay_sum_subunits, 400);
        assert_eq!(alice.net_subunits(), -300); // alice is owed 300

        let bob = sums[&UserId::from("bob")];
        assert_eq!(bob.debt_sum_subunits, 300);
        assert_eq!(bob.pay_sum_subunits, 0);
        assert_eq!(bob.net_subunits(), 300);

        // Money conservation across the receipt
        let net_total: i64 = sums.values().map(ParticipantSum::net_subunits).sum();
        assert_eq!(net_total, 0);
    }

    #[test]
    fn test_receipt_sums_unconsumed_item_is_payer_only() {
        let receipt = ReceiptId::new();
        let orphan = item(receipt, 250, 1);
        let payer = UserId::from("alice");

        let sums = receipt_sums(&[orphan], &[], Some(&payer)).unwrap();
        let alice = sums[&UserId::from("alice")];
        assert_eq!(alice.pay_sum_subunits, 250);
        assert_eq!(alice.debt_sum_subunits, 0);
    }

    #[test]
    fn test_receipt_sums_without_payer() {
        let receipt = ReceiptId::new();
        let snack = item(receipt, 90, 1);
        let consumers = vec![consumer(snack.id, "bob", 1)];

        let sums = receipt_sums(&[snack], &consumers, None).unwrap();
        assert_eq!(sums[&UserId::from("bob")].debt_sum_subunits, 90);
        assert_eq!(sums.len(), 1);
    }
}
