//! Rule-based polarity scoring in the style of VADER.
//!
//! Each lexicon word carries a valence in roughly [-4, 4]. Valences are
//! adjusted by preceding boosters and negations, by a contrastive "but",
//! by ALL-CAPS emphasis and by exclamation marks, then summed and squashed
//! into [-1, 1] with `s / sqrt(s^2 + 15)`.

use std::collections::HashMap;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without", "cannot", "can't", "nothing",
];

const NEGATION_WINDOW: usize = 3;
const NEGATION_SCALAR: f64 = -0.74;

const BOOSTER_INCREMENT: f64 = 0.293;
const BOOSTER_DECREMENT: f64 = -0.293;
const CAPS_INCREMENT: f64 = 0.733;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;

/// Normalization constant for the compound score
const ALPHA: f64 = 15.0;

const INCREASING_BOOSTERS: &[&str] = &[
    "absolutely", "amazingly", "completely", "considerably", "deeply", "enormously",
    "entirely", "especially", "exceptionally", "extremely", "greatly", "highly",
    "hugely", "incredibly", "intensely", "majorly", "more", "most", "particularly",
    "purely", "quite", "really", "remarkably", "sharply", "significantly", "so",
    "strongly", "substantially", "thoroughly", "totally", "tremendously", "very",
];

const DECREASING_BOOSTERS: &[&str] = &[
    "almost", "less", "little", "marginally", "mildly", "modestly",
    "occasionally", "partly", "scarcely", "slightly", "somewhat",
];

/// General-purpose valences
const BASE_LEXICON: &[(&str, f64)] = &[
    ("good", 1.9), ("great", 3.1), ("excellent", 3.2), ("positive", 2.6),
    ("best", 3.2), ("better", 1.9), ("happy", 2.7), ("optimistic", 1.3),
    ("optimism", 2.5), ("confident", 2.2), ("confidence", 2.3), ("success", 2.7),
    ("successful", 2.8), ("win", 2.8), ("wins", 2.7), ("winning", 2.4),
    ("improve", 1.9), ("improved", 2.1), ("improves", 1.8), ("improvement", 2.0),
    ("support", 1.7), ("supports", 1.5), ("benefit", 2.0), ("benefits", 1.6),
    ("opportunity", 1.8), ("opportunities", 1.6), ("record", 0.8), ("robust", 1.4),
    ("solid", 1.3), ("stable", 1.2), ("upbeat", 1.9), ("encouraging", 2.4),
    ("impressive", 2.3), ("boost", 1.7), ("boosts", 1.3), ("boosted", 1.5),
    ("rise", 1.0), ("rises", 0.8), ("rising", 0.8), ("jump", 0.9), ("jumps", 0.8),
    ("climb", 0.9), ("climbs", 0.9), ("advance", 1.1), ("advances", 1.0),
    ("bad", -2.5), ("worse", -2.1), ("worst", -3.1), ("poor", -2.1),
    ("negative", -2.7), ("fear", -2.2), ("fears", -1.8), ("worry", -1.9),
    ("worries", -1.8), ("worried", -1.2), ("concern", -1.2), ("concerns", -1.1),
    ("uncertain", -1.2), ("uncertainty", -1.4), ("fail", -2.5), ("fails", -2.2),
    ("failed", -2.3), ("failure", -2.3), ("lose", -1.7), ("loses", -1.3),
    ("losing", -1.6), ("losses", -1.7), ("threat", -2.4), ("threatens", -1.6),
    ("problem", -1.7), ("problems", -1.7), ("trouble", -1.7), ("warning", -1.4),
    ("warns", -0.4), ("pressure", -1.2), ("pressures", -0.8), ("slow", -0.7),
    ("slows", -0.7), ("slowdown", -1.6), ("recession", -2.1), ("default", -1.3),
    ("bankruptcy", -2.6), ("lawsuit", -0.9), ("fraud", -2.8), ("scandal", -1.9),
    ("panic", -2.3), ("sink", -1.3), ("sinks", -1.2),
    ("disappointing", -2.2), ("disappoint", -1.7), ("disappoints", -1.6),
    ("hurt", -2.4), ("hurts", -2.2), ("cut", -1.1), ("cuts", -1.1),
];

/// Market vocabulary, overriding the general lexicon where they overlap
const FINANCE_LEXICON: &[(&str, f64)] = &[
    // Positive
    ("bullish", 3.0), ("surge", 2.5), ("surges", 2.5), ("rally", 2.5), ("rallies", 2.5),
    ("soar", 2.5), ("soars", 2.5), ("boom", 2.0), ("breakout", 2.0), ("upgrade", 2.0),
    ("upgraded", 2.0), ("outperform", 2.0), ("beat", 1.5), ("beats", 1.5), ("gain", 1.5),
    ("gains", 1.5), ("profit", 1.5), ("profits", 1.5), ("growth", 1.5), ("recovery", 1.5),
    ("uptrend", 1.5), ("strong", 1.0), ("buy", 1.0),
    // Negative
    ("bearish", -3.0), ("crash", -3.0), ("crashes", -3.0), ("plunge", -2.5), ("plunges", -2.5),
    ("tumble", -2.5), ("tumbles", -2.5), ("slump", -2.5), ("crisis", -2.5), ("collapse", -2.5),
    ("downgrade", -2.0), ("downgraded", -2.0), ("underperform", -2.0), ("miss", -1.5),
    ("misses", -1.5), ("loss", -1.5), ("decline", -1.5), ("declines", -1.5), ("drop", -1.5),
    ("drops", -1.5), ("fall", -1.5), ("falls", -1.5), ("weak", -1.0), ("sell", -1.0),
    ("risk", -1.0), ("volatility", -0.5),
];

/// Polarity scorer with a word-valence lexicon.
pub struct LexiconScorer {
    lexicon: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
struct Token {
    lower: String,
    shouting: bool,
}

impl LexiconScorer {
    /// General lexicon plus finance terms.
    pub fn new() -> Self {
        let mut lexicon: HashMap<String, f64> = BASE_LEXICON
            .iter()
            .map(|(w, v)| (w.to_string(), *v))
            .collect();
        for (w, v) in FINANCE_LEXICON {
            lexicon.insert(w.to_string(), *v);
        }
        Self { lexicon }
    }

    /// Add or override word valences.
    pub fn with_terms<'a>(mut self, terms: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        for (w, v) in terms {
            self.lexicon.insert(w.to_lowercase(), v);
        }
        self
    }

    pub fn valence(&self, word: &str) -> Option<f64> {
        self.lexicon.get(&word.to_lowercase()).copied()
    }

    /// Compound polarity in [-1, 1]. Empty or neutral text scores 0.
    pub fn polarity(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }

        let mixed_case = tokens.iter().any(|t| t.shouting) && tokens.iter().any(|t| !t.shouting);

        let mut valences: Vec<f64> = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let Some(base) = self.lexicon.get(&token.lower).copied() else {
                valences.push(0.0);
                continue;
            };
            let mut valence = base;
            if token.shouting && mixed_case {
                valence += CAPS_INCREMENT * valence.signum();
            }

            for distance in 1..=NEGATION_WINDOW {
                let Some(prev) = i.checked_sub(distance).map(|p| &tokens[p]) else {
                    break;
                };
                let boost = booster_scalar(prev, valence, mixed_case);
                if boost != 0.0 {
                    valence += boost * (1.0 - 0.05 * (distance - 1) as f64);
                }
            }

            let negated = (1..=NEGATION_WINDOW)
                .filter_map(|d| i.checked_sub(d))
                .any(|p| NEGATION_WORDS.contains(&tokens[p].lower.as_str()));
            if negated {
                valence *= NEGATION_SCALAR;
            }

            valences.push(valence);
        }

        apply_but_rule(&tokens, &mut valences);

        let mut sum: f64 = valences.iter().sum();
        if sum != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS);
            sum += bangs as f64 * EXCLAMATION_INCREMENT * sum.signum();
        }

        normalize(sum)
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|w| w.chars().count() > 1)
        .map(|w| {
            let letters: Vec<char> = w.chars().filter(|c| c.is_alphabetic()).collect();
            Token {
                lower: w.to_lowercase(),
                shouting: letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()),
            }
        })
        .collect()
}

fn booster_scalar(token: &Token, valence: f64, mixed_case: bool) -> f64 {
    let mut scalar = if INCREASING_BOOSTERS.contains(&token.lower.as_str()) {
        BOOSTER_INCREMENT
    } else if DECREASING_BOOSTERS.contains(&token.lower.as_str()) {
        BOOSTER_DECREMENT
    } else {
        return 0.0;
    };

    if valence < 0.0 {
        scalar = -scalar;
    }
    if token.shouting && mixed_case {
        scalar += CAPS_INCREMENT * valence.signum();
    }
    scalar
}

/// Sentiment before "but" is damped, after it amplified.
fn apply_but_rule(tokens: &[Token], valences: &mut [f64]) {
    let Some(but_index) = tokens.iter().position(|t| t.lower == "but") else {
        return;
    };
    for (i, v) in valences.iter_mut().enumerate() {
        if i < but_index {
            *v *= 0.5;
        } else if i > but_index {
            *v *= 1.5;
        }
    }
}

fn normalize(sum: f64) -> f64 {
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
}
