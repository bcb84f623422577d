//! Channel identifiers shared by the document store and the chat provider.
//!
//! ```text
//! dm_{lower uid}_{higher uid}          direct messages, order independent
//! group_{unix millis}_{9 x [0-9a-z]}   group channels
//! ```

use chrono::{DateTime, Utc};
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const GROUP_SUFFIX_LEN: usize = 9;

/// Deterministic id for the direct-message channel between two users.
///
/// Ordering is byte-wise, so `dm_channel_id(a, b) == dm_channel_id(b, a)`.
pub fn dm_channel_id(a: &str, b: &str) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("dm_{low}_{high}")
}

/// Fresh group channel id for a channel created at `now`.
pub fn group_channel_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..GROUP_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("group_{}_{}", now.timestamp_millis(), suffix)
}

/// True when `id` has the shape produced by [`group_channel_id`].
pub fn is_group_channel_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix("group_") else {
        return false;
    };
    let Some((millis, suffix)) = rest.split_once('_') else {
        return false;
    };
    !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == GROUP_SUFFIX_LEN
        && suffix.bytes().all(|b| BASE36.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};
    use test_case::test_case;

    #[test_case("u1", "u2", "dm_u1_u2")]
    #[test_case("u2", "u1", "dm_u1_u2")]
    #[test_case("Zed", "alice", "dm_Zed_alice" ; "uppercase sorts first")]
    #[test_case("same", "same", "dm_same_same")]
    fn dm_id_is_order_independent(a: &str, b: &str, expected: &str) {
        assert_eq!(dm_channel_id(a, b), expected);
        assert_eq!(dm_channel_id(b, a), expected);
    }

    #[test]
    fn group_id_embeds_creation_millis() {
        let now = Utc.timestamp_millis_opt(1_717_000_000_123).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let id = group_channel_id(now, &mut rng);

        assert!(id.starts_with("group_1717000000123_"), "{id}");
        assert!(is_group_channel_id(&id), "{id}");
    }

    #[test]
    fn group_ids_differ_between_calls() {
        let now = Utc::now();
        let mut rng = rand::rng();

        assert_ne!(group_channel_id(now, &mut rng), group_channel_id(now, &mut rng));
    }

    #[test_case("group_123_abc" ; "short suffix")]
    #[test_case("group__abcdefghi" ; "missing millis")]
    #[test_case("group_12x_abcdefghi" ; "non numeric millis")]
    #[test_case("group_123_ABCDEFGHI" ; "uppercase suffix")]
    #[test_case("dm_u1_u2" ; "dm id")]
    fn rejects_malformed_group_ids(id: &str) {
        assert!(!is_group_channel_id(id));
    }
}
