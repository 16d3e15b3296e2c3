//! Search configuration.
//!
//! [`SearchConfig`] mirrors the configuration file key for key; the CLI
//! deserialises it from TOML and anything else with a serde frontend works
//! too. [`SearchConfig::compile`] validates the values and parses the
//! patterns into the boards the engine actually consumes.
//!
//! A `-1` disables the corresponding cap; `[-1, -1]` disables a bounding
//! box.

use crate::{
    board::BitBoard,
    error::Error,
    rle::PatternLayers,
    search::MAX_CELL_TIMER_GENS,
    stable::LifeStable,
    symmetry::SymmetryTransform,
    unknown::LifeUnknown,
};
use serde::Deserialize;

/// The raw configuration, one field per recognised key.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SearchConfig {
    /// The seed pattern, in Bellman-extended RLE: `A` active on, `B`
    /// unknown stable, `C` marked stable on, `D` marked stable off, `E`
    /// stator on.
    pub pattern: String,
    /// Translation applied to the pattern.
    pub pattern_center: [i32; 2],

    /// Generations between which the first interaction may happen.
    pub first_active_range: [i32; 2],
    /// Allowed perturbation duration after the interaction.
    pub active_window_range: [i32; 2],
    /// Recovered generations needed to count as success.
    pub min_stable_interval: u32,

    pub max_active_cells: i32,
    pub active_bounds: [i32; 2],
    pub max_component_active_cells: i32,
    pub component_active_bounds: [i32; 2],

    pub max_ever_active_cells: i32,
    pub ever_active_bounds: [i32; 2],
    pub max_component_ever_active_cells: i32,
    pub component_ever_active_bounds: [i32; 2],

    pub max_changes: i32,
    pub changes_bounds: [i32; 2],
    pub max_component_changes: i32,
    pub component_changes_bounds: [i32; 2],

    pub max_cell_active_window: i32,
    pub max_cell_active_streak: i32,
    pub max_cell_stationary_distance: i32,
    /// Accepted for compatibility; the engine has no streak counterpart of
    /// the stationary-distance rule.
    pub max_cell_stationary_streak: i32,

    /// Whether to complete solutions into concrete still lifes.
    pub stabilise_results: bool,
    /// Completion budget in seconds.
    pub stabilise_results_timeout: u64,
    /// Whether completion should keep looking for the smallest still life.
    pub minimise_results: bool,
    /// Report oscillating non-recoveries instead of discarding them.
    pub report_oscillators: bool,
    /// Accepted for compatibility; the glancing analysis belongs to the
    /// other search variant and has no effect here.
    pub skip_glancing: bool,
    /// Keep searching below a branch that already produced a solution.
    pub continue_after_success: bool,
    /// Reject solutions whose stabilisation works like an eater2.
    pub forbid_eater2: bool,
    /// Print a grid of all solutions at the end.
    pub print_summary: bool,
    /// Machine-friendly output: implies quick stabilisation, no summary.
    pub pipe_results: bool,

    /// Symmetry of the input, applied to the pattern while loading.
    pub symmetry: String,

    /// Generation at which the filter must match; `-1` disables it.
    pub filter_gen: i32,
    /// The filter pattern (marked cells are compared).
    pub filter: String,
    /// Translation of the filter pattern.
    pub filter_pos: [i32; 2],

    /// Patterns which, once fully determined, disqualify a solution.
    pub forbidden: Vec<ForbiddenConfig>,

    /// How many cheap branch steps may run between full frontier
    /// recalculations.
    pub max_branch_fast_count: u32,
    /// Bound on refinement rounds inside one frontier calculation.
    pub max_calculate_rounds: u32,
    /// Depth of the quick forced-mask lookahead.
    pub max_fast_lookahead_gens: u32,
}

/// One entry of the `forbidden` array.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ForbiddenConfig {
    /// The forbidden pattern, Bellman-extended RLE.
    pub forbidden: String,
    /// Its position.
    pub forbidden_pos: [i32; 2],
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            pattern: String::new(),
            pattern_center: [0, 0],
            first_active_range: [0, 100],
            active_window_range: [0, 100],
            min_stable_interval: 4,
            max_active_cells: -1,
            active_bounds: [-1, -1],
            max_component_active_cells: -1,
            component_active_bounds: [-1, -1],
            max_ever_active_cells: -1,
            ever_active_bounds: [-1, -1],
            max_component_ever_active_cells: -1,
            component_ever_active_bounds: [-1, -1],
            max_changes: -1,
            changes_bounds: [-1, -1],
            max_component_changes: -1,
            component_changes_bounds: [-1, -1],
            max_cell_active_window: -1,
            max_cell_active_streak: -1,
            max_cell_stationary_distance: -1,
            max_cell_stationary_streak: -1,
            stabilise_results: true,
            stabilise_results_timeout: 3,
            minimise_results: false,
            report_oscillators: false,
            skip_glancing: true,
            continue_after_success: false,
            forbid_eater2: false,
            print_summary: true,
            pipe_results: false,
            symmetry: String::from("identity"),
            filter_gen: -1,
            filter: String::new(),
            filter_pos: [0, 0],
            forbidden: Vec::new(),
            max_branch_fast_count: 1,
            max_calculate_rounds: 1,
            max_fast_lookahead_gens: 3,
        }
    }
}

/// A fully-known pattern a solution must not contain.
#[derive(Clone, Debug, Default)]
pub struct Forbidden {
    /// Cells that take part in the comparison.
    pub mask: BitBoard,
    /// The values they must *not* all have.
    pub state: BitBoard,
}

/// A pattern the evolved solution must reach at a given generation.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    pub gen: u32,
    pub mask: BitBoard,
    pub pattern: BitBoard,
}

/// The compiled search parameters: validated numbers and parsed boards.
#[derive(Clone, Debug)]
pub struct SearchParams {
    pub min_first_active_gen: u32,
    pub max_first_active_gen: u32,
    pub min_active_window_gens: u32,
    pub max_active_window_gens: u32,
    pub min_stable_interval: u32,

    pub max_active_cells: i32,
    pub active_bounds: (i32, i32),
    pub max_component_active_cells: i32,
    pub component_active_bounds: (i32, i32),

    pub max_ever_active_cells: i32,
    pub ever_active_bounds: (i32, i32),
    pub max_component_ever_active_cells: i32,
    pub component_ever_active_bounds: (i32, i32),

    pub max_changes: i32,
    pub changes_bounds: (i32, i32),
    pub max_component_changes: i32,
    pub component_changes_bounds: (i32, i32),

    pub max_cell_active_window: i32,
    pub max_cell_active_streak: i32,
    pub max_cell_stationary_distance: i32,

    pub stabilise_results: bool,
    pub stabilise_results_timeout: u64,
    pub minimise_results: bool,
    pub report_oscillators: bool,
    pub continue_after_success: bool,
    pub forbid_eater2: bool,
    pub print_summary: bool,
    pub pipe_results: bool,

    pub max_branch_fast_count: u32,
    pub max_calculate_rounds: u32,
    pub max_fast_lookahead_gens: u32,

    /// The initial stable state: known background plus the unknown search
    /// region.
    pub stable: LifeStable,
    /// The generation-zero configuration.
    pub starting_state: LifeUnknown,
    /// Cells that must never change.
    pub stator: BitBoard,
    pub has_stator: bool,

    pub filter: Option<Filter>,
    pub forbidden: Vec<Forbidden>,
}

impl SearchConfig {
    /// Validates the configuration and compiles the patterns into boards.
    pub fn compile(&self) -> Result<SearchParams, Error> {
        if self.pattern.is_empty() {
            return Err(Error::MissingPattern);
        }

        for (key, value) in [
            ("max-cell-active-window", self.max_cell_active_window),
            ("max-cell-active-streak", self.max_cell_active_streak),
        ] {
            if value > MAX_CELL_TIMER_GENS as i32 {
                return Err(Error::TimerTooLong {
                    key,
                    value,
                    max: MAX_CELL_TIMER_GENS,
                });
            }
        }

        let symmetry: SymmetryTransform = self.symmetry.parse()?;

        let mut pattern = PatternLayers::parse(&self.pattern)?;
        pattern.translate(-self.pattern_center[0], -self.pattern_center[1]);
        if symmetry != SymmetryTransform::Identity {
            pattern.symmetrise(symmetry);
        }

        let stable_on = (pattern.state & pattern.marked) | pattern.original;
        let mut stable = LifeStable::new();
        stable.set_off(&!(pattern.history | stable_on));
        stable.set_on(&stable_on);

        let starting_state = LifeUnknown {
            state: pattern.state,
            unknown: pattern.history,
            unknown_stable: pattern.history,
        };

        let filter = if self.filter_gen >= 0 {
            if self.filter.is_empty() {
                return Err(Error::MissingFilter);
            }
            let mut layers = PatternLayers::parse(&self.filter)?;
            layers.translate(self.filter_pos[0], self.filter_pos[1]);
            Some(Filter {
                gen: self.filter_gen as u32,
                mask: layers.marked,
                pattern: layers.state,
            })
        } else {
            None
        };

        let mut forbidden = Vec::with_capacity(self.forbidden.len());
        for entry in &self.forbidden {
            let mut layers = PatternLayers::parse(&entry.forbidden)?;
            layers.translate(entry.forbidden_pos[0], entry.forbidden_pos[1]);
            forbidden.push(Forbidden {
                mask: layers.marked,
                state: layers.state,
            });
        }

        let mut params = SearchParams {
            min_first_active_gen: self.first_active_range[0].max(0) as u32,
            max_first_active_gen: self.first_active_range[1].max(0) as u32,
            min_active_window_gens: self.active_window_range[0].max(0) as u32,
            max_active_window_gens: self.active_window_range[1].max(0) as u32,
            min_stable_interval: self.min_stable_interval.max(1),
            max_active_cells: self.max_active_cells,
            active_bounds: (self.active_bounds[0], self.active_bounds[1]),
            max_component_active_cells: self.max_component_active_cells,
            component_active_bounds: (
                self.component_active_bounds[0],
                self.component_active_bounds[1],
            ),
            max_ever_active_cells: self.max_ever_active_cells,
            ever_active_bounds: (self.ever_active_bounds[0], self.ever_active_bounds[1]),
            max_component_ever_active_cells: self.max_component_ever_active_cells,
            component_ever_active_bounds: (
                self.component_ever_active_bounds[0],
                self.component_ever_active_bounds[1],
            ),
            max_changes: self.max_changes,
            changes_bounds: (self.changes_bounds[0], self.changes_bounds[1]),
            max_component_changes: self.max_component_changes,
            component_changes_bounds: (
                self.component_changes_bounds[0],
                self.component_changes_bounds[1],
            ),
            max_cell_active_window: self.max_cell_active_window,
            max_cell_active_streak: self.max_cell_active_streak,
            max_cell_stationary_distance: self.max_cell_stationary_distance,
            stabilise_results: self.stabilise_results,
            stabilise_results_timeout: self.stabilise_results_timeout,
            minimise_results: self.minimise_results,
            report_oscillators: self.report_oscillators,
            continue_after_success: self.continue_after_success,
            forbid_eater2: self.forbid_eater2,
            print_summary: self.print_summary,
            pipe_results: self.pipe_results,
            max_branch_fast_count: self.max_branch_fast_count,
            max_calculate_rounds: self.max_calculate_rounds.max(1),
            max_fast_lookahead_gens: self.max_fast_lookahead_gens,
            stable,
            starting_state,
            stator: pattern.original,
            has_stator: !pattern.original.is_empty(),
            filter,
            forbidden,
        };

        if params.pipe_results {
            params.stabilise_results = true;
            params.stabilise_results_timeout = 1;
            params.minimise_results = false;
            params.print_summary = false;
        }

        Ok(params)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config: SearchConfig = toml::from_str(
            r#"
            pattern = "3A$BBB!"
            first-active-range = [2, 30]
            max-active-cells = 6
            min-stable-interval = 5
            report-oscillators = true

            [[forbidden]]
            forbidden = "CC!"
            forbidden-pos = [1, 1]
            "#,
        )
        .unwrap();

        assert_eq!(config.first_active_range, [2, 30]);
        assert_eq!(config.active_window_range, [0, 100]);
        assert_eq!(config.max_active_cells, 6);
        assert!(config.stabilise_results);
        assert_eq!(config.max_branch_fast_count, 1);

        let params = config.compile().unwrap();
        assert_eq!(params.min_first_active_gen, 2);
        assert_eq!(params.max_first_active_gen, 30);
        assert_eq!(params.min_stable_interval, 5);
        assert!(params.report_oscillators);
        assert_eq!(params.starting_state.state.population(), 3);
        assert_eq!(params.stable.unknown.population(), 3);
        assert_eq!(params.forbidden.len(), 1);
        assert!(params.forbidden[0].mask.get((1, 1)));
        assert!(params.forbidden[0].state.get((2, 1)));
    }

    #[test]
    fn pattern_required() {
        let config = SearchConfig::default();
        assert_eq!(config.compile().unwrap_err(), Error::MissingPattern);
    }

    #[test]
    fn timer_cap_enforced() {
        let config = SearchConfig {
            pattern: String::from("A!"),
            max_cell_active_window: 8,
            ..SearchConfig::default()
        };
        assert!(matches!(
            config.compile(),
            Err(Error::TimerTooLong { value: 8, .. })
        ));
    }

    #[test]
    fn pipe_results_rewrites_flags() {
        let config = SearchConfig {
            pattern: String::from("A!"),
            pipe_results: true,
            minimise_results: true,
            ..SearchConfig::default()
        };
        let params = config.compile().unwrap();
        assert!(params.stabilise_results);
        assert_eq!(params.stabilise_results_timeout, 1);
        assert!(!params.minimise_results);
        assert!(!params.print_summary);
    }

    #[test]
    fn symmetry_folds_pattern() {
        let config = SearchConfig {
            pattern: String::from(".A!"),
            symmetry: String::from("C2"),
            ..SearchConfig::default()
        };
        let params = config.compile().unwrap();
        // The half turn about the origin doubles the off-center cell.
        assert_eq!(params.starting_state.state.population(), 2);
        assert!(params.starting_state.state.get((1, 0)));
        assert!(params.starting_state.state.get((-1, 0)));

        let bad = SearchConfig {
            pattern: String::from("A!"),
            symmetry: String::from("D4"),
            ..SearchConfig::default()
        };
        assert!(matches!(bad.compile(), Err(Error::UnknownSymmetry(_))));
    }

    #[test]
    fn stable_layers_split() {
        // C is known on, D known off, B unknown, E stator.
        let config = SearchConfig {
            pattern: String::from("CDBE!"),
            ..SearchConfig::default()
        };
        let params = config.compile().unwrap();
        assert!(params.stable.state.get((0, 0)));
        assert!(!params.stable.state.get((1, 0)));
        assert!(!params.stable.unknown.get((1, 0)));
        assert!(params.stable.unknown.get((2, 0)));
        assert!(params.stable.state.get((3, 0)));
        assert!(params.has_stator);
        assert!(params.stator.get((3, 0)));
        assert!(params.starting_state.unknown_stable.get((2, 0)));
    }
}
