use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::Rng;
use serde::Deserialize;
use serde_json::from_str;
use std::error::Error;

static TEXT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/texts");

/// Lessons always run on a one-minute clock.
pub const LESSON_DURATION_SECS: u32 = 60;

#[derive(Deserialize, Clone, Debug)]
pub struct Passages {
    pub one_minute: Vec<String>,
    pub five_minute: Vec<String>,
    pub ten_minute: Vec<String>,
}

impl Passages {
    pub fn load() -> Self {
        read_text_file("passages.json").expect("embedded passages are valid")
    }

    /// Passages sized for a test of `duration_secs`.
    pub fn pool_for(&self, duration_secs: u32) -> &[String] {
        match duration_secs {
            0..=60 => &self.one_minute,
            61..=300 => &self.five_minute,
            _ => &self.ten_minute,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Lesson {
    pub id: String,
    pub name: String,
    pub text: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Lessons {
    beginner: Vec<Lesson>,
    intermediate: Vec<Lesson>,
    advanced: Vec<Lesson>,
}

impl Lessons {
    pub fn load() -> Self {
        read_text_file("lessons.json").expect("embedded lessons are valid")
    }

    pub fn for_level(&self, level: Level) -> &[Lesson] {
        match level {
            Level::Beginner => &self.beginner,
            Level::Intermediate => &self.intermediate,
            Level::Advanced => &self.advanced,
        }
    }

    /// Lessons are numbered from 1 within their level.
    pub fn get(&self, level: Level, number: usize) -> Option<&Lesson> {
        number
            .checked_sub(1)
            .and_then(|idx| self.for_level(level).get(idx))
    }
}

fn read_text_file<T: for<'de> Deserialize<'de>>(file_name: &str) -> Result<T, Box<dyn Error>> {
    let file = TEXT_DIR
        .get_file(file_name)
        .ok_or_else(|| format!("text file not found: {file_name}"))?;

    let file_as_str = file
        .contents_utf8()
        .ok_or("unable to interpret text file as a string")?;

    Ok(from_str(file_as_str)?)
}

/// Random passage selection that never hands out the same passage twice in a row.
#[derive(Debug, Default)]
pub struct TextPicker {
    last_index: Option<usize>,
}

impl TextPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pick<'a, R: Rng>(&mut self, pool: &'a [String], rng: &mut R) -> Option<&'a str> {
        if pool.is_empty() {
            return None;
        }

        let mut idx = rng.gen_range(0..pool.len());
        if pool.len() > 1 && Some(idx) == self.last_index {
            idx = (idx + 1) % pool.len();
        }
        self.last_index = Some(idx);
        Some(&pool[idx])
    }

    pub fn pick_for_duration(&mut self, passages: &Passages, duration_secs: u32) -> Option<String> {
        let pool = passages.pool_for(duration_secs);
        self.pick(pool, &mut rand::thread_rng()).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_passages_load() {
        let passages = Passages::load();

        assert!(!passages.one_minute.is_empty());
        assert!(!passages.five_minute.is_empty());
        assert!(!passages.ten_minute.is_empty());
    }

    #[test]
    fn test_pool_for_duration() {
        let passages = Passages::load();

        assert_eq!(passages.pool_for(30), passages.one_minute.as_slice());
        assert_eq!(passages.pool_for(60), passages.one_minute.as_slice());
        assert_eq!(passages.pool_for(61), passages.five_minute.as_slice());
        assert_eq!(passages.pool_for(300), passages.five_minute.as_slice());
        assert_eq!(passages.pool_for(600), passages.ten_minute.as_slice());
    }

    #[test]
    fn test_lessons_by_level() {
        let lessons = Lessons::load();

        for level in [Level::Beginner, Level::Intermediate, Level::Advanced] {
            assert!(!lessons.for_level(level).is_empty());
        }
        assert_eq!(
            lessons.get(Level::Beginner, 1).map(|l| l.id.as_str()),
            Some("home-row-left")
        );
        assert!(lessons.get(Level::Beginner, 0).is_none());
        assert!(lessons.get(Level::Advanced, 99).is_none());
    }

    #[test]
    fn test_picker_never_repeats() {
        let pool: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let mut picker = TextPicker::new();
        let mut rng = StdRng::seed_from_u64(7);

        let mut last = picker.pick(&pool, &mut rng).unwrap();
        for _ in 0..200 {
            let next = picker.pick(&pool, &mut rng).unwrap();
            assert_ne!(next, last);
            last = next;
        }
    }

    #[test]
    fn test_picker_single_and_empty_pool() {
        let mut picker = TextPicker::new();
        let mut rng = StdRng::seed_from_u64(1);

        let single = vec!["only".to_string()];
        assert_eq!(picker.pick(&single, &mut rng), Some("only"));
        assert_eq!(picker.pick(&single, &mut rng), Some("only"));
        assert_eq!(picker.pick(&[], &mut rng), None);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Intermediate.to_string(), "intermediate");
    }
}
