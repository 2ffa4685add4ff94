use std::time::Duration;

/// Characters per standard word.
pub const CHARS_PER_WORD: f64 = 5.0;

/// Speed and accuracy figures derived from typed input against a reference text.
///
/// Nothing in here is stored on the session; it is recomputed from
/// `(input, target, elapsed)` whenever someone asks for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStats {
    pub total_chars: usize,
    pub correct_chars: usize,
    pub errors: usize,
    pub gross_wpm: f64,
    pub net_wpm: f64,
    pub accuracy: f64,
    pub elapsed_secs: f64,
}

impl SessionStats {
    /// Stats of a session nobody has typed into yet.
    pub fn baseline() -> Self {
        Self {
            total_chars: 0,
            correct_chars: 0,
            errors: 0,
            gross_wpm: 0.0,
            net_wpm: 0.0,
            accuracy: 100.0,
            elapsed_secs: 0.0,
        }
    }

    /// Position-by-position comparison; a mismatch at index `i` is one error,
    /// with no attempt to realign after skipped or extra characters.
    ///
    /// `elapsed` is `None` when the session never started.
    pub fn compute(input: &[char], target: &[char], elapsed: Option<Duration>) -> Self {
        let (correct_chars, errors) = input
            .iter()
            .enumerate()
            .fold((0, 0), |(correct, wrong), (i, c)| {
                if target.get(i) == Some(c) {
                    (correct + 1, wrong)
                } else {
                    (correct, wrong + 1)
                }
            });

        let total_chars = input.len();
        let elapsed_secs = elapsed.map_or(0.0, |d| d.as_secs_f64());
        let minutes = effective_minutes(elapsed_secs / 60.0);

        let gross_wpm = (total_chars as f64 / CHARS_PER_WORD) / minutes;
        let net_wpm = (gross_wpm - errors as f64 / minutes).max(0.0);
        let accuracy = if total_chars == 0 {
            100.0
        } else {
            correct_chars as f64 / total_chars as f64 * 100.0
        };

        Self {
            total_chars,
            correct_chars,
            errors,
            gross_wpm,
            net_wpm,
            accuracy,
            elapsed_secs,
        }
    }

    /// Net WPM rounded to a whole number, the figure shown to the user.
    pub fn wpm(&self) -> u32 {
        self.net_wpm.round() as u32
    }

    pub fn accuracy_pct(&self) -> u32 {
        self.accuracy.round().clamp(0.0, 100.0) as u32
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Zero minutes would divide by zero, so it counts as one whole minute.
fn effective_minutes(minutes: f64) -> f64 {
    if minutes > 0.0 {
        minutes
    } else {
        1.0
    }
}

/// The standalone WPM calculator: characters, minutes and errors typed in by hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WpmCalculation {
    pub gross_wpm: f64,
    pub net_wpm: f64,
}

impl WpmCalculation {
    pub fn new(total_chars: u64, minutes: f64, errors: u64) -> Self {
        let minutes = effective_minutes(minutes);
        let gross_wpm = (total_chars as f64 / CHARS_PER_WORD) / minutes;
        let net_wpm = (gross_wpm - errors as f64 / minutes).max(0.0);
        Self { gross_wpm, net_wpm }
    }
}

/// Accuracy for the standalone calculator, rounded to two decimal places.
pub fn accuracy_percent(total_chars: u64, errors: u64) -> f64 {
    if total_chars == 0 {
        return 100.0;
    }
    let pct = (total_chars as f64 - errors as f64) / total_chars as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_baseline() {
        let stats = SessionStats::baseline();
        assert_eq!(stats.wpm(), 0);
        assert_eq!(stats.accuracy_pct(), 100);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn test_perfect_typing_in_six_seconds() {
        let stats = SessionStats::compute(
            &chars("hello"),
            &chars("hello"),
            Some(Duration::from_secs(6)),
        );

        assert_eq!(stats.correct_chars, 5);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.accuracy_pct(), 100);
        assert_eq!(stats.gross_wpm.round(), 10.0);
        assert_eq!(stats.wpm(), 10);
    }

    #[test]
    fn test_errors_floor_net_wpm() {
        let stats = SessionStats::compute(
            &chars("hxllo"),
            &chars("hello"),
            Some(Duration::from_secs(6)),
        );

        assert_eq!(stats.correct_chars, 4);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.accuracy_pct(), 80);
        assert_eq!(stats.gross_wpm.round(), 10.0);
        assert_eq!(stats.wpm(), 0);
        assert!(stats.net_wpm >= 0.0);
    }

    #[test]
    fn test_net_wpm_never_negative() {
        let stats = SessionStats::compute(
            &chars("zzzzz"),
            &chars("hello"),
            Some(Duration::from_secs(1)),
        );

        assert_eq!(stats.errors, 5);
        assert_eq!(stats.net_wpm, 0.0);
        assert_eq!(stats.accuracy_pct(), 0);
    }

    #[test]
    fn test_zero_elapsed_counts_as_one_minute() {
        let stats = SessionStats::compute(&chars("hello"), &chars("hello"), Some(Duration::ZERO));
        assert_eq!(stats.gross_wpm, 1.0);

        let never_started = SessionStats::compute(&chars("hello"), &chars("hello"), None);
        assert_eq!(never_started.gross_wpm, 1.0);
    }

    #[test]
    fn test_shifted_input_counts_every_position() {
        // one skipped character misaligns everything after it
        let stats = SessionStats::compute(
            &chars("hllo"),
            &chars("hello"),
            Some(Duration::from_secs(60)),
        );

        assert_eq!(stats.correct_chars, 2);
        assert_eq!(stats.errors, 2);
    }

    #[test]
    fn test_wpm_calculator() {
        let calc = WpmCalculation::new(1500, 5.0, 10);
        assert_eq!(calc.gross_wpm, 60.0);
        assert_eq!(calc.net_wpm, 58.0);

        let zero_minutes = WpmCalculation::new(50, 0.0, 0);
        assert_eq!(zero_minutes.gross_wpm, 10.0);

        let floored = WpmCalculation::new(10, 1.0, 100);
        assert_eq!(floored.net_wpm, 0.0);
    }

    #[test]
    fn test_accuracy_calculator() {
        assert_eq!(accuracy_percent(0, 0), 100.0);
        assert_eq!(accuracy_percent(2000, 10), 99.5);
        assert_eq!(accuracy_percent(3, 1), 66.67);
    }
}
