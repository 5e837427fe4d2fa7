// src/types.rs

//! Phase identifiers shared by the config loader, CLI and scheduler.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::GogoError;

/// A stage of a run. Variants are declared in execution order, so the derived
/// `Ord` is the sweep order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Phase {
    PreClean,
    Clean,
    PostClean,
    PreBuild,
    Build,
    PostBuild,
    PreVlog,
    Vlog,
    PostVlog,
    PreSimulate,
    Simulate,
    PostSimulate,
    FinalCleanup,
}

impl Phase {
    pub const ALL: [Phase; 13] = [
        Phase::PreClean,
        Phase::Clean,
        Phase::PostClean,
        Phase::PreBuild,
        Phase::Build,
        Phase::PostBuild,
        Phase::PreVlog,
        Phase::Vlog,
        Phase::PostVlog,
        Phase::PreSimulate,
        Phase::Simulate,
        Phase::PostSimulate,
        Phase::FinalCleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreClean => "pre_clean",
            Phase::Clean => "clean",
            Phase::PostClean => "post_clean",
            Phase::PreBuild => "pre_build",
            Phase::Build => "build",
            Phase::PostBuild => "post_build",
            Phase::PreVlog => "pre_vlog",
            Phase::Vlog => "vlog",
            Phase::PostVlog => "post_vlog",
            Phase::PreSimulate => "pre_simulate",
            Phase::Simulate => "simulate",
            Phase::PostSimulate => "post_simulate",
            Phase::FinalCleanup => "final_cleanup",
        }
    }

    /// The main phase this phase belongs to (`pre_vlog` -> `vlog`).
    pub fn main_phase(&self) -> MainPhase {
        match self {
            Phase::PreClean | Phase::Clean | Phase::PostClean => MainPhase::Clean,
            Phase::PreBuild | Phase::Build | Phase::PostBuild => MainPhase::Build,
            Phase::PreVlog | Phase::Vlog | Phase::PostVlog => MainPhase::Vlog,
            Phase::PreSimulate | Phase::Simulate | Phase::PostSimulate => MainPhase::Simulate,
            Phase::FinalCleanup => MainPhase::FinalCleanup,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = GogoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Phase::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| GogoError::UnknownPhase(wanted.to_string()))
    }
}

impl TryFrom<String> for Phase {
    type Error = GogoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The groups of phases a user selects on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MainPhase {
    Clean,
    Build,
    Vlog,
    Simulate,
    FinalCleanup,
}

impl MainPhase {
    /// The `pre_`, main and `post_` phases of this group.
    pub fn phases(&self) -> &'static [Phase] {
        match self {
            MainPhase::Clean => &[Phase::PreClean, Phase::Clean, Phase::PostClean],
            MainPhase::Build => &[Phase::PreBuild, Phase::Build, Phase::PostBuild],
            MainPhase::Vlog => &[Phase::PreVlog, Phase::Vlog, Phase::PostVlog],
            MainPhase::Simulate => &[Phase::PreSimulate, Phase::Simulate, Phase::PostSimulate],
            MainPhase::FinalCleanup => &[Phase::FinalCleanup],
        }
    }
}

/// The set of phases a run will sweep. Phases outside the set are skipped
/// along with everything registered in them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseSet {
    phases: BTreeSet<Phase>,
}

impl PhaseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            phases: Phase::ALL.iter().copied().collect(),
        }
    }

    pub fn insert(&mut self, phase: Phase) {
        self.phases.insert(phase);
    }

    pub fn insert_main(&mut self, main: MainPhase) {
        self.phases.extend(main.phases().iter().copied());
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    pub fn iter(&self) -> impl Iterator<Item = Phase> + '_ {
        self.phases.iter().copied()
    }
}

impl FromIterator<MainPhase> for PhaseSet {
    fn from_iter<I: IntoIterator<Item = MainPhase>>(iter: I) -> Self {
        let mut set = PhaseSet::new();
        for main in iter {
            set.insert_main(main);
        }
        set
    }
}
