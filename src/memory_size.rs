use crate::error::SubmitError;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Amount of memory requested from SLURM. Bare numbers are megabytes, as sbatch reads them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Memory {
    MegaByte(u64),
    GigaByte(u64),
}

impl Display for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Memory::MegaByte(memory) => write!(f, "{}M", memory),
            Memory::GigaByte(memory) => write!(f, "{}G", memory),
        }
    }
}

impl FromStr for Memory {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (amount, unit) = trimmed.split_at(split);
        let amount: u64 = amount
            .parse()
            .map_err(|_| SubmitError::InvalidMemory(s.to_string()))?;
        match unit.to_ascii_uppercase().as_str() {
            "" | "M" | "MB" => Ok(Memory::MegaByte(amount)),
            "G" | "GB" => Ok(Memory::GigaByte(amount)),
            _ => Err(SubmitError::InvalidMemory(s.to_string())),
        }
    }
}

impl TryFrom<String> for Memory {
    type Error = SubmitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Whether the amount applies to the whole node or to every allocated CPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryRequest {
    PerNode(Memory),
    PerCpu(Memory),
}

impl MemoryRequest {
    /// The sbatch option carrying this request, without the `#SBATCH` prefix.
    pub fn directive(&self) -> String {
        match self {
            MemoryRequest::PerNode(memory) => format!("--mem={}", memory),
            MemoryRequest::PerCpu(memory) => format!("--mem-per-cpu={}", memory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units() {
        assert_eq!("2000".parse::<Memory>().unwrap(), Memory::MegaByte(2000));
        assert_eq!("2000M".parse::<Memory>().unwrap(), Memory::MegaByte(2000));
        assert_eq!("4gb".parse::<Memory>().unwrap(), Memory::GigaByte(4));
        assert!(matches!(
            "lots".parse::<Memory>(),
            Err(SubmitError::InvalidMemory(_))
        ));
        assert!("12T".parse::<Memory>().is_err());
    }

    #[test]
    fn renders_directives() {
        assert_eq!(
            MemoryRequest::PerCpu(Memory::MegaByte(2000)).directive(),
            "--mem-per-cpu=2000M"
        );
        assert_eq!(
            MemoryRequest::PerNode(Memory::GigaByte(8)).directive(),
            "--mem=8G"
        );
    }
}
