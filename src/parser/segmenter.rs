//! Compound-prompt splitting.
//!
//! A prompt like "send 0.5 SOL to X and tip 0.1 SOL to Jito" is two
//! independent intents. We split on a joiner only when it is immediately
//! followed by a recognized action verb, so amounts and token lists
//! ("1 SOL and 2 USDC") never get cut apart.

/// Joiners that may separate two intents. The comma variant covers
/// "do X, do Y" phrasing.
const JOINERS: &[&str] = &[" and ", " then ", " also ", " + ", ", "];

/// Action verbs that may open a segment. Multi-word verbs are listed
/// so "liquid stake 5 SOL" keeps its qualifier.
const ACTION_VERBS: &[&str] = &[
    "liquid stake",
    "native stake",
    "take a loan",
    "take out",
    "loan me",
    "get a loan",
    "pay back",
    "pay off",
    "pull out",
    "swap",
    "send",
    "transfer",
    "tip",
    "unstake",
    "stake",
    "buy",
    "sell",
    "ape",
    "memo",
    "write",
    "create",
    "close",
    "dump",
    "convert",
    "trade",
    "exchange",
    "provide",
    "add",
    "remove",
    "open",
    "deactivate",
    "withdraw",
    "supply",
    "deposit",
    "lend",
    "borrow",
    "repay",
    "put",
    "invest",
    "lock",
    "settle",
    "return",
];

/// Whether `text` begins with an action verb at a word boundary.
fn starts_with_verb(text: &str) -> bool {
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let lower = text.to_ascii_lowercase();
    ACTION_VERBS.iter().any(|verb| {
        lower.starts_with(verb)
            && lower[verb.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Split a prompt into independently parseable segments.
///
/// Splitting preserves the verb: the segment following a joiner begins
/// with the verb that licensed the split. A prompt with no joiner comes
/// back as a singleton; empty segments are discarded.
pub fn split(prompt: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut rest = prompt;

    'outer: loop {
        let lower = rest.to_ascii_lowercase();
        // Earliest joiner position that is followed by a verb wins, so
        // segments come out in left-to-right order.
        let mut cut: Option<(usize, usize)> = None;
        for joiner in JOINERS {
            let mut from = 0;
            while let Some(offset) = lower[from..].find(joiner) {
                let at = from + offset;
                let after = at + joiner.len();
                if starts_with_verb(&rest[after..]) {
                    if cut.is_none_or(|(best, _)| at < best) {
                        cut = Some((at, after));
                    }
                    break;
                }
                from = after;
            }
        }

        match cut {
            Some((at, after)) => {
                let head = rest[..at].trim();
                if !head.is_empty() {
                    segments.push(head.to_string());
                }
                rest = &rest[after..];
            }
            None => {
                let tail = rest.trim();
                if !tail.is_empty() {
                    segments.push(tail.to_string());
                }
                break 'outer;
            }
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_joiner_returns_singleton() {
        assert_eq!(split("swap 1 SOL for USDC"), vec!["swap 1 SOL for USDC"]);
    }

    #[test]
    fn splits_on_and_before_verb() {
        let segments = split("transfer 0.5 SOL to addr and tip 0.1 SOL to Jito");
        assert_eq!(
            segments,
            vec!["transfer 0.5 SOL to addr", "tip 0.1 SOL to Jito"]
        );
    }

    #[test]
    fn and_without_following_verb_does_not_split() {
        assert_eq!(
            split("provide 1 SOL and 2 USDC liquidity on orca"),
            vec!["provide 1 SOL and 2 USDC liquidity on orca"]
        );
    }

    #[test]
    fn verbs_embedded_in_words_do_not_split() {
        // "understand" ends with "stand", not a verb boundary issue;
        // "band" must not be read as "b" + "and".
        assert_eq!(
            split("memo my band and my understanding"),
            vec!["memo my band and my understanding"]
        );
    }

    #[test]
    fn then_and_comma_joiners() {
        let segments = split("buy 1 SOL of BONK, sell 2 WIF then stake 3 SOL");
        assert_eq!(
            segments,
            vec!["buy 1 SOL of BONK", "sell 2 WIF", "stake 3 SOL"]
        );
    }

    #[test]
    fn multiword_verb_keeps_qualifier() {
        let segments = split("swap 1 SOL for USDC and liquid stake 5 SOL");
        assert_eq!(segments[1], "liquid stake 5 SOL");
    }
}
