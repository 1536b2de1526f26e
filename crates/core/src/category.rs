// crates/core/src/category.rs
//! The closed seven-label taxonomy a snippet is sorted into.
//!
//! The first five labels are drivelology (nonsense with an underlying logic,
//! irony or twist); the last two are reference categories for contrast.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    ReversePunchline,
    FigurativeLiteralism,
    CulturalSwitchbait,
    InevitableContradiction,
    SemanticMisdirection,
    PureNonsense,
    NormalSentence,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::ReversePunchline,
        Self::FigurativeLiteralism,
        Self::CulturalSwitchbait,
        Self::InevitableContradiction,
        Self::SemanticMisdirection,
        Self::PureNonsense,
        Self::NormalSentence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReversePunchline => "reverse punchline",
            Self::FigurativeLiteralism => "figurative literalism or homophonic pun",
            Self::CulturalSwitchbait => "cultural or linguistic switchbait",
            Self::InevitableContradiction => "inevitable contradiction",
            Self::SemanticMisdirection => "semantic misdirection",
            Self::PureNonsense => "pure nonsense",
            Self::NormalSentence => "normal sentence",
        }
    }

    /// Parse a label as a model tends to return it.
    ///
    /// Case and runs of whitespace are ignored, so `"Reverse  Punchline "`
    /// is accepted. Anything outside the seven labels is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
    }

    /// True for the five drivelology labels, false for the two reference labels.
    pub fn is_drivelology(&self) -> bool {
        !matches!(self, Self::PureNonsense | Self::NormalSentence)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown category: {value:?}"))
    }
}
