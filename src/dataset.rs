//! Dataset name classification.
//!
//! Dataset names follow `/<primary>/<processed>/<TIER>`; only the tier
//! suffix matters here.

/// Data tier recognised from the dataset name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTier {
    Nano,
    Mini,
    User,
    Other,
}

impl DataTier {
    pub fn of(dataset: &str) -> Self {
        if dataset.ends_with("NANOAODSIM") || dataset.ends_with("NANOAOD") {
            DataTier::Nano
        } else if dataset.ends_with("MINIAODSIM") || dataset.ends_with("MINIAOD") {
            DataTier::Mini
        } else if dataset.ends_with("USER") {
            DataTier::User
        } else {
            DataTier::Other
        }
    }

    /// Nano datasets must be swapped for their parent before processing.
    pub fn needs_parent(&self) -> bool {
        matches!(self, DataTier::Nano)
    }
}

/// Which template a dataset is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Simulation,
    Collision,
}

impl SampleKind {
    pub fn of(dataset: &str) -> Self {
        if dataset.ends_with("SIM") {
            SampleKind::Simulation
        } else {
            SampleKind::Collision
        }
    }

    pub fn is_mc(&self) -> bool {
        matches!(self, SampleKind::Simulation)
    }

    /// Tag used in processing configuration file names.
    pub fn pset_tag(&self) -> &'static str {
        match self {
            SampleKind::Simulation => "MC",
            SampleKind::Collision => "data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(DataTier::of("/TT/RunIIAutumn18NanoAODv6-x/NANOAODSIM"), DataTier::Nano);
        assert_eq!(DataTier::of("/SingleMuon/Run2018A-Nano25Oct2019-v1/NANOAOD"), DataTier::Nano);
        assert_eq!(DataTier::of("/TT/RunIIAutumn18MiniAOD-x/MINIAODSIM"), DataTier::Mini);
        assert_eq!(DataTier::of("/TT/someone-private/USER"), DataTier::User);
        assert_eq!(DataTier::of("/TT/RunIIAutumn18DRPremix-x/AODSIM"), DataTier::Other);
        assert!(DataTier::of("/A/B/NANOAOD").needs_parent());
        assert!(!DataTier::of("/A/B/MINIAOD").needs_parent());
    }

    #[test]
    fn test_sample_kind() {
        assert!(SampleKind::of("/TT/x/MINIAODSIM").is_mc());
        assert!(SampleKind::of("/TT/x/AODSIM").is_mc());
        assert!(!SampleKind::of("/SingleMuon/Run2018A/MINIAOD").is_mc());
        assert!(!SampleKind::of("/TT/someone-private/USER").is_mc());
        assert_eq!(SampleKind::Simulation.pset_tag(), "MC");
        assert_eq!(SampleKind::Collision.pset_tag(), "data");
    }
}
