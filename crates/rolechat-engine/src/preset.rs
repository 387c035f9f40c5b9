//! Role presets that bias the assistant's tone.
//!
//! A preset is sent as the `system` entry at the front of every request.

use serde::{Deserialize, Serialize};

/// A system-level instruction chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RolePreset {
    /// Talk to a seasoned software professional.
    #[default]
    SeasonedProfessional,
    /// Teach a student in a classroom.
    Classroom,
    /// Present to senior engineers.
    SeniorEngineers,
    /// Answer like a cowboy.
    Cowboy,
}

impl RolePreset {
    /// All presets in selector order.
    pub fn all() -> [RolePreset; 4] {
        [
            RolePreset::SeasonedProfessional,
            RolePreset::Classroom,
            RolePreset::SeniorEngineers,
            RolePreset::Cowboy,
        ]
    }

    /// The system directive sent to the completion service.
    pub fn content(self) -> &'static str {
        match self {
            RolePreset::SeasonedProfessional => {
                "Explain things like you're talking to a software professional with 20 years of experience."
            }
            RolePreset::Classroom => {
                "Provide details as if you're instructing a student in a classroom."
            }
            RolePreset::SeniorEngineers => {
                "Discuss the topic as if you're presenting to a group of senior engineers."
            }
            RolePreset::Cowboy => "Answer like you are a cowboy",
        }
    }

    /// Short label for the preset bar.
    pub fn label(self) -> &'static str {
        match self {
            RolePreset::SeasonedProfessional => "Seasoned professional",
            RolePreset::Classroom => "Classroom",
            RolePreset::SeniorEngineers => "Senior engineers",
            RolePreset::Cowboy => "Cowboy",
        }
    }

    /// Stable name used on the command line and in config files.
    pub fn name(self) -> &'static str {
        match self {
            RolePreset::SeasonedProfessional => "seasoned-professional",
            RolePreset::Classroom => "classroom",
            RolePreset::SeniorEngineers => "senior-engineers",
            RolePreset::Cowboy => "cowboy",
        }
    }

    /// Position in [`RolePreset::all`].
    pub fn index(self) -> usize {
        Self::all()
            .iter()
            .position(|p| *p == self)
            .unwrap_or_default()
    }

    /// Look up a preset by its exact directive string.
    pub fn from_content(content: &str) -> Option<Self> {
        Self::all().into_iter().find(|p| p.content() == content)
    }

    /// Look up a preset by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::all().into_iter().find(|p| p.name() == name)
    }

    /// Preset at `index`, wrapping around.
    pub fn nth_wrapping(index: usize) -> Self {
        let all = Self::all();
        all[index % all.len()]
    }
}
