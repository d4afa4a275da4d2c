use std::fmt;
use std::str::FromStr;

/// Data-taking periods accepted by the `--era` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Era {
    #[cfg_attr(feature = "cli", value(name = "2016"))]
    Run2016,
    #[cfg_attr(feature = "cli", value(name = "2017"))]
    Run2017,
    #[cfg_attr(feature = "cli", value(name = "2018"))]
    Run2018,
    #[cfg_attr(feature = "cli", value(name = "2018ABC"))]
    Run2018ABC,
    #[cfg_attr(feature = "cli", value(name = "2018D"))]
    Run2018D,
}

impl Era {
    pub const ALL: [Era; 5] = [
        Era::Run2016,
        Era::Run2017,
        Era::Run2018,
        Era::Run2018ABC,
        Era::Run2018D,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Era::Run2016 => "2016",
            Era::Run2017 => "2017",
            Era::Run2018 => "2018",
            Era::Run2018ABC => "2018ABC",
            Era::Run2018D => "2018D",
        }
    }

    /// Manifest era keys are free-form; the filter matches them verbatim.
    pub fn matches(&self, era: &str) -> bool {
        self.as_str() == era
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Era {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Era::ALL
            .iter()
            .copied()
            .find(|era| era.as_str() == s)
            .ok_or_else(|| format!("Invalid era: {}", s))
    }
}

/// Keep only the digits of an era key: `2018ABC` becomes `2018`.
pub fn year_of(era: &str) -> String {
    era.chars().filter(|c| c.is_ascii_digit()).collect()
}
