//! The course's pages and their URLs.
use crate::error::LabError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Home,
    GradientDescent,
    Perceptron,
    ToyExercise,
    Generalizing,
    Backpropagation,
}

impl Page {
    /// Navigation order.
    pub const ALL: [Page; 6] = [
        Page::Home,
        Page::GradientDescent,
        Page::Perceptron,
        Page::ToyExercise,
        Page::Generalizing,
        Page::Backpropagation,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::GradientDescent => "/gradient-descent",
            Page::Perceptron => "/perceptron",
            Page::ToyExercise => "/toy-exercise",
            Page::Generalizing => "/generalizing",
            Page::Backpropagation => "/backpropagation",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::GradientDescent => "Gradient Descent",
            Page::Perceptron => "Perceptron",
            Page::ToyExercise => "Toy Exercise",
            Page::Generalizing => "Generalizing",
            Page::Backpropagation => "Backpropagation",
        }
    }

    /// CLI subcommand that renders the page's numbers, if any.
    pub fn command(self) -> Option<&'static str> {
        match self {
            Page::Home => None,
            Page::GradientDescent => Some("descent"),
            Page::Perceptron => Some("perceptron"),
            Page::ToyExercise => Some("toy"),
            Page::Generalizing => Some("multilayer"),
            Page::Backpropagation => Some("train"),
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Page {
    type Err = LabError;

    /// Accepts `/toy-exercise`, `toy-exercise` and trailing slashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let key = trimmed.trim_matches('/');
        Page::ALL
            .into_iter()
            .find(|page| page.path().trim_start_matches('/') == key)
            .ok_or_else(|| LabError::Unknown {
                kind: "route",
                value: trimmed.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        for page in Page::ALL {
            assert_eq!(page.path().parse::<Page>().unwrap(), page);
        }
    }

    #[test]
    fn lenient_parsing() {
        assert_eq!("".parse::<Page>().unwrap(), Page::Home);
        assert_eq!("perceptron/".parse::<Page>().unwrap(), Page::Perceptron);
        assert!("/nope".parse::<Page>().is_err());
    }
}
