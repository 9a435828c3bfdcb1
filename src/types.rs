use std::fmt;
use std::str::FromStr;

/// Opaque identifier the scheduler hands back for an accepted submission.
///
/// For HTCondor this is the cluster id of the DAGMan job itself; events for
/// the node jobs it spawns carry other cluster ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunHandle(u64);

impl RunHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunHandle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(RunHandle)
            .map_err(|e| format!("invalid run id '{s}': {e}"))
    }
}

/// How a scheduler binding resolves relative paths inside the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkingDirMode {
    /// The binding accepts a working directory per call.
    #[default]
    PerCall,
    /// The binding resolves against the process working directory, so the
    /// client has to change it for the duration of the transaction.
    ProcessWide,
}

/// How an awaited submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    Success,
    Failure,
    /// The wait was cancelled before a terminal event arrived.
    Cancelled,
}
