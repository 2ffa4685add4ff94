use clap::ValueEnum;

use crate::session::SessionConfig;

/// Rules of one simulated typing examination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamPreset {
    pub kind: ExamKind,
    pub name: &'static str,
    pub duration_secs: u32,
    pub backspace_allowed: bool,
    pub highlight_enabled: bool,
    pub description: &'static str,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ExamKind {
    SscChsl,
    SscCgl,
    BankClerk,
    CourtTypist,
    PracticeMock,
}

static PRESETS: [ExamPreset; 5] = [
    ExamPreset {
        kind: ExamKind::SscChsl,
        name: "SSC CHSL",
        duration_secs: 600,
        backspace_allowed: true,
        highlight_enabled: false,
        description: "10 minute English passage, 35 wpm to qualify, no highlighting",
    },
    ExamPreset {
        kind: ExamKind::SscCgl,
        name: "SSC CGL",
        duration_secs: 900,
        backspace_allowed: true,
        highlight_enabled: false,
        description: "15 minute data entry speed test at 8000 key depressions per hour",
    },
    ExamPreset {
        kind: ExamKind::BankClerk,
        name: "Bank Clerk",
        duration_secs: 300,
        backspace_allowed: false,
        highlight_enabled: false,
        description: "5 minute strict test, corrections not allowed",
    },
    ExamPreset {
        kind: ExamKind::CourtTypist,
        name: "Court Typist",
        duration_secs: 600,
        backspace_allowed: false,
        highlight_enabled: true,
        description: "10 minute transcription with highlighting, no corrections",
    },
    ExamPreset {
        kind: ExamKind::PracticeMock,
        name: "Practice Mock",
        duration_secs: 300,
        backspace_allowed: true,
        highlight_enabled: true,
        description: "5 minute relaxed mock with highlighting and corrections",
    },
];

impl ExamPreset {
    pub fn all() -> &'static [ExamPreset] {
        &PRESETS
    }

    pub fn by_id(id: &str) -> Option<&'static ExamPreset> {
        PRESETS.iter().find(|p| p.kind.to_string() == id)
    }

    pub fn session_config(&self, text: impl Into<String>) -> SessionConfig {
        SessionConfig::new(text, self.duration_secs)
            .allow_backspace(self.backspace_allowed)
            .highlight(self.highlight_enabled)
    }
}

impl ExamKind {
    pub fn preset(self) -> &'static ExamPreset {
        PRESETS
            .iter()
            .find(|p| p.kind == self)
            .unwrap_or(&PRESETS[PRESETS.len() - 1])
    }
}
