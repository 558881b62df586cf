//! Name normalization and fuzzy matching of ROM filenames against remote
//! artwork names.
//!
//! Everything here is pure: no I/O, no shared state.

const KNOWN_EXTENSIONS: [&str; 6] = [".sfc", ".smc", ".zip", ".fig", ".bin", ".png"];

/// Inputs at or beyond this many characters are not compared; they get
/// [`MAX_DISTANCE`] instead of an O(n*m) table.
pub const MAX_COMPARE_LEN: usize = 256;
pub const MAX_DISTANCE: usize = 999;

#[inline(always)]
fn strip_known_extension(name: &str) -> &str {
    for ext in KNOWN_EXTENSIONS {
        if name.len() <= ext.len() {
            continue;
        }
        let split = name.len() - ext.len();
        if !name.is_char_boundary(split) {
            continue;
        }
        if name[split..].eq_ignore_ascii_case(ext) {
            return &name[..split];
        }
    }
    name
}

/// Drops everything inside `(...)` and `[...]`, nested or not. A stray
/// closer with no matching opener is ignored.
fn strip_tags(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut paren = 0usize;
    let mut bracket = 0usize;
    for c in name.chars() {
        match c {
            '(' => paren += 1,
            ')' => paren = paren.saturating_sub(1),
            '[' => bracket += 1,
            ']' => bracket = bracket.saturating_sub(1),
            _ if paren == 0 && bracket == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

pub fn normalize(name: &str) -> String {
    let stripped = strip_tags(strip_known_extension(name));
    let mut mapped = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if c.is_ascii_alphanumeric() {
            mapped.push(c.to_ascii_lowercase());
        } else if matches!(c, ' ' | '-' | '_' | ':' | '\'') {
            mapped.push(' ');
        }
    }
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Restricted Damerau–Levenshtein (optimal string alignment) distance.
pub fn distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() >= MAX_COMPARE_LEN || b.len() >= MAX_COMPARE_LEN {
        return MAX_DISTANCE;
    }
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let cols = b.len() + 1;
    let mut d = vec![0usize; (a.len() + 1) * cols];
    for i in 0..=a.len() {
        d[i * cols] = i;
    }
    for j in 0..=b.len() {
        d[j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[(i - 1) * cols + j] + 1)
                .min(d[i * cols + j - 1] + 1)
                .min(d[(i - 1) * cols + j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[(i - 2) * cols + j - 2] + cost);
            }
            d[i * cols + j] = best;
        }
    }
    d[a.len() * cols + b.len()]
}

/// Picks the candidate closest to an already-normalized target. Candidates are
/// `(raw, normalized)` pairs. The first candidate at the minimal distance
/// wins, and an exact match stops the scan.
pub(crate) fn best_match_normalized<'a, 'n, I>(target: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'n str)>,
{
    let mut best: Option<(&'a str, usize)> = None;
    for (raw, norm) in candidates {
        let d = distance(target, norm);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((raw, d));
        }
        if d == 0 {
            break;
        }
    }
    best.map(|(raw, _)| raw)
}

pub fn best_match<'a, S: AsRef<str>>(target: &str, candidates: &'a [S]) -> Option<&'a str> {
    let target = normalize(target);
    let normalized: Vec<(&'a str, String)> = candidates
        .iter()
        .map(|c| (c.as_ref(), normalize(c.as_ref())))
        .collect();
    best_match_normalized(&target, normalized.iter().map(|(raw, n)| (*raw, n.as_str())))
}

pub fn url_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for &b in input.as_bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'~'
            | b'('
            | b')'
            | b'!'
            | b'\'' => out.push(char::from(b)),
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[inline(always)]
fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

pub fn url_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (
                    bytes.get(i + 1).copied().and_then(hex_val),
                    bytes.get(i + 2).copied().and_then(hex_val),
                ) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                        continue;
                    }
                    _ => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_extension_tags_and_punctuation() {
        assert_eq!(normalize("Super Game (USA).sfc"), "super game");
        assert_eq!(
            normalize("Legend of Zelda, The - A Link to the Past (USA) [!].SMC"),
            "legend of zelda the a link to the past"
        );
        assert_eq!(normalize("Mega_Man:X's  (Rev 1 (Beta)) Edition"), "mega man x s edition");
        assert_eq!(normalize("  Chrono   Trigger  "), "chrono trigger");
    }

    #[test]
    fn normalize_keeps_extension_when_name_is_only_the_extension() {
        assert_eq!(normalize(".sfc"), "sfc");
    }

    #[test]
    fn normalize_ignores_stray_closers() {
        assert_eq!(normalize("F-Zero) (Japan)"), "f zero");
    }

    #[test]
    fn normalize_is_idempotent() {
        for name in [
            "Super Game (USA).sfc",
            "Donkey Kong Country 2 - Diddy's Kong Quest (USA) (En,Fr) (Rev 1).zip",
            "[BIOS] Satellaview (Japan).bin",
            "weird((nest)ing)].png",
            "",
            "   ",
            "ÉCRAN spécial.fig",
        ] {
            let once = normalize(name);
            assert_eq!(normalize(&once), once, "not idempotent for {name:?}");
        }
    }

    #[test]
    fn distance_basics() {
        assert_eq!(distance("", ""), 0);
        assert_eq!(distance("abc", ""), 3);
        assert_eq!(distance("", "ab"), 2);
        assert_eq!(distance("kitten", "sitting"), 3);
        assert_eq!(distance("ab", "ba"), 1);
        assert_eq!(distance("ca", "abc"), 3);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let words = ["super mario world", "super mario wrold", "zelda", "", "f zero", "ab"];
        for a in words {
            assert_eq!(distance(a, a), 0);
            for b in words {
                assert_eq!(distance(a, b), distance(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn distance_caps_long_inputs() {
        let long = "a".repeat(MAX_COMPARE_LEN);
        assert_eq!(distance(&long, "a"), MAX_DISTANCE);
        assert_eq!(distance("a", &long), MAX_DISTANCE);
        assert_eq!(distance(&long, &long), 0);
    }

    #[test]
    fn best_match_prefers_exact_and_closest() {
        let candidates = [
            "Super Mario Kart (USA).png",
            "Super Game (USA).png",
            "Super Gamer (Japan).png",
        ];
        assert_eq!(
            best_match("Super Game (Europe).sfc", &candidates),
            Some("Super Game (USA).png")
        );
        assert_eq!(
            best_match("Super Gamr.smc", &candidates),
            Some("Super Game (USA).png")
        );
    }

    #[test]
    fn best_match_self_match() {
        for name in ["Super Game", "chrono trigger", "X"] {
            assert_eq!(best_match(name, &[name]), Some(name));
        }
    }

    #[test]
    fn best_match_tie_keeps_first_candidate() {
        let candidates = ["abd", "abe"];
        assert_eq!(best_match("abc", &candidates), Some("abd"));
        let reversed = ["abe", "abd"];
        assert_eq!(best_match("abc", &reversed), Some("abe"));
    }

    #[test]
    fn best_match_empty_candidates() {
        let none: [&str; 0] = [];
        assert_eq!(best_match("anything", &none), None);
    }

    #[test]
    fn url_codec() {
        assert_eq!(url_encode("Super Game (USA).png"), "Super%20Game%20(USA).png");
        assert_eq!(url_encode("A&B/C"), "A%26B%2FC");
        assert_eq!(url_decode("Super%20Game.png"), "Super Game.png");
        assert_eq!(url_decode("a+b"), "a b");
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("%zz"), "%zz");
        assert_eq!(url_decode("%41"), "A");
        assert_eq!(url_decode(&url_encode("Kirby's Dream Land & 3")), "Kirby's Dream Land & 3");
    }
}
