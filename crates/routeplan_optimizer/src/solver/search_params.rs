use jiff::{SignedDuration, Timestamp};

/// The default terminations only count iterations, so a seed always yields the same plan.
/// A `Duration` termination bounds the wall clock instead, the plan then depends on how
/// many iterations the machine runs before it is reached.
#[derive(Clone, Debug)]
pub struct SearchParams {
    /// The search stops as soon as one of them is reached
    pub terminations: Vec<Termination>,

    /// Seed of the ruin and recreate random generator
    pub seed: u64,

    pub ruin: RuinParams,

    pub enable_local_search: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Termination {
    Duration(SignedDuration),
    Iterations(usize),
    IterationsWithoutImprovement(usize),
}

/// Number of groups removed by one ruin, drawn in `[min_groups, max_groups]` and capped by
/// `max_ratio` of the assigned groups.
#[derive(Clone, Debug)]
pub struct RuinParams {
    pub min_groups: usize,
    pub max_groups: usize,
    pub max_ratio: f64,
}

impl Default for RuinParams {
    fn default() -> Self {
        RuinParams {
            min_groups: 1,
            max_groups: 10,
            max_ratio: 0.3,
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            terminations: vec![
                Termination::Iterations(1000),
                Termination::IterationsWithoutImprovement(250),
            ],
            seed: 42,
            ruin: RuinParams::default(),
            enable_local_search: true,
        }
    }
}

impl SearchParams {
    /// Smallest duration termination, if any.
    pub fn max_duration(&self) -> Option<SignedDuration> {
        self.terminations
            .iter()
            .filter_map(|termination| match termination {
                Termination::Duration(duration) => Some(*duration),
                _ => None,
            })
            .min()
    }
}

/// Wall clock of one search, only consulted for duration terminations.
#[derive(Clone, Copy, Debug)]
pub struct SearchClock {
    start: Timestamp,
    max_duration: Option<SignedDuration>,
}

impl SearchClock {
    pub fn start(params: &SearchParams) -> Self {
        SearchClock {
            start: Timestamp::now(),
            max_duration: params.max_duration(),
        }
    }

    pub fn elapsed(&self) -> SignedDuration {
        Timestamp::now().duration_since(self.start)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_duration
            .is_some_and(|max_duration| self.elapsed() > max_duration)
    }
}
