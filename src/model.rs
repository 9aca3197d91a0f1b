use crate::error::SubmitError;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Force-field parameter sets understood by the simulation driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ModelVariant {
    M1,
    M2,
    M3,
    Avg,
    HpsUrry,
    Hps,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 6] = [
        ModelVariant::M1,
        ModelVariant::M2,
        ModelVariant::M3,
        ModelVariant::Avg,
        ModelVariant::HpsUrry,
        ModelVariant::Hps,
    ];

    /// Token passed to `--model`/`--ff` on the command line of the external tools.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::M1 => "M1",
            ModelVariant::M2 => "M2",
            ModelVariant::M3 => "M3",
            ModelVariant::Avg => "AVG",
            ModelVariant::HpsUrry => "HPSUrry",
            ModelVariant::Hps => "HPS",
        }
    }
}

impl Display for ModelVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelVariant::ALL
            .iter()
            .find(|model| model.as_str() == s.trim())
            .copied()
            .ok_or_else(|| SubmitError::UnknownModel(s.to_string()))
    }
}

impl TryFrom<String> for ModelVariant {
    type Error = SubmitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_back() {
        for model in ModelVariant::ALL {
            assert_eq!(model.as_str().parse::<ModelVariant>().unwrap(), model);
        }
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = "M4".parse::<ModelVariant>().unwrap_err();
        assert!(matches!(err, SubmitError::UnknownModel(ref token) if token == "M4"));
        assert!(err.to_string().contains("HPSUrry"));
    }

    #[test]
    fn tokens_are_case_sensitive() {
        assert!("hps".parse::<ModelVariant>().is_err());
        assert_eq!("HPS".parse::<ModelVariant>().unwrap(), ModelVariant::Hps);
    }
}
