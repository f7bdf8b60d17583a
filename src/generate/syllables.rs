//! English syllable estimation.
//!
//! Vowel-group counting with the usual corrections for silent endings. It is a heuristic:
//! good enough to reject model output that is clearly off the 5-7-5 shape.

/// Syllables in one word. Anything without letters counts as zero.
pub fn count_word(word: &str) -> usize {
    let w: String = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if w.is_empty() {
        return 0;
    }
    if w.len() <= 3 {
        return 1;
    }

    let mut stem = w.as_str();
    let bytes = stem.as_bytes();
    let n = bytes.len();

    if stem.ends_with("es") && !matches!(bytes[n - 3], b's' | b'x' | b'z' | b'c' | b'g' | b'h') {
        // makes, times, goes
        stem = &stem[..n - 2];
    } else if stem.ends_with("ed") && !matches!(bytes[n - 3], b't' | b'd') {
        // jumped, rained
        stem = &stem[..n - 2];
    } else if stem.ends_with('e') && !(stem.ends_with("le") && !is_vowel(bytes[n - 3])) {
        // silent e, but keep consonant + "le" (ta-ble)
        stem = &stem[..n - 1];
    }

    // Leading y is a consonant (yellow, young).
    let stem = stem.strip_prefix('y').unwrap_or(stem);

    let bytes = stem.as_bytes();
    let mut groups = 0;
    let mut prev_vowel = false;
    for (i, &b) in bytes.iter().enumerate() {
        let v = is_vowel(b);
        if v && (!prev_vowel || is_hiatus(bytes, i)) {
            groups += 1;
        }
        prev_vowel = v;
    }
    groups.max(1)
}

/// Two adjacent vowels sounded separately (li-on, pi-a-no, ac-tu-al).
/// `i` is the index of the second vowel.
fn is_hiatus(w: &[u8], i: usize) -> bool {
    if i == 0 {
        return false;
    }
    let before = if i >= 2 { w[i - 2] } else { b'-' };
    match (w[i - 1], w[i]) {
        // nation, special, region, onion, million stay one syllable
        (b'i', b'a' | b'o' | b'u') => {
            !matches!(before, b'c' | b's' | b't' | b'g' | b'x' | b'n')
                && !(before == b'l' && i >= 3 && w[i - 3] == b'l')
        }
        // quality, language
        (b'u', b'a' | b'o') => !matches!(before, b'q' | b'g'),
        _ => false,
    }
}

/// Syllables in a line of text; words split on whitespace and hyphens.
pub fn count_line(line: &str) -> usize {
    line.split(|c: char| c.is_whitespace() || c == '-' || c == '\u{2014}')
        .map(count_word)
        .sum()
}

fn is_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u' | b'y')
}
