//! Size-bounded splitting of serialized results.
//!
//! The channel carrying results has a hard per-message limit, so one logical
//! result is sent as `parts` ordered messages. Sizes are counted in `char`s
//! and splits always land on a character boundary.

/// Maximum characters of payload per outgoing message.
pub const CHUNK_SIZE: usize = 100_000;

/// Number of messages needed for a payload of `len` characters.
///
/// Always at least one, so an empty payload still produces a message the
/// receiver can observe.
pub fn part_count(len: usize, chunk_size: usize) -> usize {
    let chunk_size = chunk_size.max(1);
    len.div_ceil(chunk_size).max(1)
}

/// Split `payload` into consecutive slices of at most `chunk_size` characters.
///
/// The returned vector is never empty; concatenating it in order yields
/// `payload` exactly.
pub fn split_chunks(payload: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    if payload.is_empty() {
        return vec![""];
    }

    let mut chunks = Vec::with_capacity(part_count(payload.len(), chunk_size));
    let mut start = 0usize;
    let mut count = 0usize;

    for (offset, _) in payload.char_indices() {
        if count == chunk_size {
            chunks.push(&payload[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&payload[start..]);

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_yields_one_empty_chunk() {
        assert_eq!(split_chunks("", 10), vec![""]);
        assert_eq!(part_count(0, 10), 1);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_chunk() {
        let chunks = split_chunks("abcdef", 3);
        assert_eq!(chunks, vec!["abc", "def"]);
        assert_eq!(part_count(6, 3), 2);
    }

    #[test]
    fn remainder_goes_to_last_chunk() {
        let chunks = split_chunks("abcdefg", 3);
        assert_eq!(chunks, vec!["abc", "def", "g"]);
        assert_eq!(part_count(7, 3), 3);
    }

    #[test]
    fn splits_on_character_boundaries() {
        let text = "héllo wörld ✓✓✓";
        let chunks = split_chunks(text, 4);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 4));
        assert_eq!(chunks.concat(), text);
        assert_eq!(chunks.len(), part_count(text.chars().count(), 4));
    }

    #[test]
    fn concatenation_reproduces_payload_for_many_sizes() {
        let text: String = (0..1_000u32)
            .map(|n| char::from_u32(0x41 + (n % 26)).unwrap_or('x'))
            .collect();

        for size in [1usize, 7, 99, 100, 999, 1_000, 1_001] {
            let chunks = split_chunks(&text, size);
            assert_eq!(chunks.len(), part_count(text.len(), size), "size {size}");
            assert_eq!(chunks.concat(), text, "size {size}");
        }
    }

    #[test]
    fn default_chunk_size_keeps_small_results_whole() {
        let chunks = split_chunks("5", CHUNK_SIZE);
        assert_eq!(chunks, vec!["5"]);
    }

    #[test]
    fn zero_chunk_size_is_treated_as_one() {
        assert_eq!(split_chunks("ab", 0), vec!["a", "b"]);
        assert_eq!(part_count(2, 0), 2);
    }
}
