use proptest::prelude::*;

use agora_types::{BlockHeight, Identity, TokenAmount};

proptest! {
    /// BlockHeight ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn block_height_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ha = BlockHeight::new(a);
        let hb = BlockHeight::new(b);
        prop_assert_eq!(ha <= hb, a <= b);
        prop_assert_eq!(ha == hb, a == b);
    }

    /// blocks_until is the saturating distance between two heights.
    #[test]
    fn block_height_blocks_until(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let start = BlockHeight::new(base);
        let later = BlockHeight::new(base + offset);
        prop_assert_eq!(start.blocks_until(later), offset);
        prop_assert_eq!(later.blocks_until(start), 0);
    }

    /// is_reached agrees with manual comparison.
    #[test]
    fn block_height_is_reached(target in 0u64..1_000_000, now in 0u64..1_000_000) {
        prop_assert_eq!(BlockHeight::new(target).is_reached(BlockHeight::new(now)), now >= target);
    }

    /// saturating_add never wraps.
    #[test]
    fn block_height_saturating_add(base in 0u64..u64::MAX, blocks in 0u64..u64::MAX) {
        let sum = BlockHeight::new(base).saturating_add(blocks);
        prop_assert!(sum >= BlockHeight::new(base));
        prop_assert_eq!(sum.as_u64(), base.saturating_add(blocks));
    }

    /// checked_sub on TokenAmount returns None exactly when it would underflow.
    #[test]
    fn token_amount_checked_sub(a in 0u128..u128::MAX, b in 0u128..u128::MAX) {
        let result = TokenAmount::new(a).checked_sub(TokenAmount::new(b));
        prop_assert_eq!(result.is_none(), b > a);
        if let Some(diff) = result {
            prop_assert_eq!(diff.raw(), a - b);
        }
    }

    /// Identities built from non-whitespace strings of sane length always parse.
    #[test]
    fn identity_parse_accepts_tokens(raw in "[a-z0-9_]{1,64}") {
        let id = Identity::parse(&raw).unwrap();
        prop_assert_eq!(id.as_str(), raw.as_str());
    }
}
