use catsrc_lib::{BitBoard, LifeStable, Search, SearchConfig};
use std::{sync::atomic::AtomicBool, time::Duration};

fn run(config_text: &str) -> Search {
    let config: SearchConfig = toml::from_str(config_text).unwrap();
    let mut search = Search::new(config.compile().unwrap());
    search.run();
    search
}

/// A fully known still life with nothing active: the search has nothing to
/// interact with and terminates without solutions.
#[test]
fn known_block_terminates() {
    let search = run(
        r#"
        pattern = "CC$CC!"
        first-active-range = [0, 5]
        stabilise-results = false
        print-summary = false
        "#,
    );
    assert!(search.solutions().is_empty());
}

/// An unknown region the active pattern never reaches stays symbolic; the
/// search runs out of its first-active window.
#[test]
fn distant_region_terminates() {
    let search = run(
        r#"
        pattern = ".A$..A$AAA$30$40.3B$40.3B$40.3B!"
        first-active-range = [0, 4]
        stabilise-results = false
        print-summary = false
        "#,
    );
    assert!(search.solutions().is_empty());
}

/// With `max-active-cells = 0` no catalysis can happen: a glider cannot be
/// absorbed without any cell ever going active.
#[test]
fn infeasible_active_cap() {
    let search = run(
        r#"
        pattern = ".A$A$3A$$4.3B$4.3B$4.3B!"
        first-active-range = [0, 12]
        active-window-range = [0, 8]
        min-stable-interval = 3
        max-active-cells = 0
        stabilise-results = false
        print-summary = false
        "#,
    );
    assert!(search.solutions().is_empty());
}

/// A glider aimed at a small search region: whatever the search reports
/// must satisfy the configured limits, and every completed stabilisation
/// must be a genuine still life.
#[test]
fn glider_catalyst_solutions_are_consistent() {
    let search = run(
        r#"
        pattern = ".A$A$3A$$4.3B$4.3B$4.3B!"
        first-active-range = [0, 12]
        active-window-range = [0, 8]
        min-stable-interval = 3
        max-active-cells = 4
        stabilise-results = true
        stabilise-results-timeout = 2
        print-summary = false
        "#,
    );

    for solution in search.solutions() {
        // The interaction may begin anywhere up to the configured bound
        // plus the lookahead window.
        assert!(solution.interaction_gen <= 12 + 4);
        assert!(solution.recovery_gen >= solution.interaction_gen);
        assert!(solution.recovery_gen <= solution.interaction_gen + 8 + 3);
        if !solution.completed.is_empty() {
            assert_eq!(solution.completed.step(), solution.completed);
        }
    }
}

/// A forbidden pattern that already matches the known background kills
/// every branch at the root.
#[test]
fn forbidden_pattern_prunes() {
    let search = run(
        r#"
        pattern = "CC$CC$$3B$3B!"
        first-active-range = [0, 5]
        stabilise-results = false
        print-summary = false

        [[forbidden]]
        forbidden = "CC$CC!"
        "#,
    );
    assert!(search.solutions().is_empty());
}

/// A pre-set abort flag stops the search before it commits anything.
#[test]
fn abort_flag_stops_immediately() {
    let config: SearchConfig = toml::from_str(
        r#"
        pattern = ".A$A$3A$$4.3B$4.3B$4.3B!"
        first-active-range = [0, 50]
        stabilise-results = false
        print-summary = false
        "#,
    )
    .unwrap();
    let mut search = Search::new(config.compile().unwrap());
    let abort = AtomicBool::new(true);
    search.run_with_abort(&abort);
    assert!(search.solutions().is_empty());
}

/// An eater1 with its tail removed completes back into a still life
/// containing the known cells.
#[test]
fn eater_completion() {
    let mut eater = BitBoard::new();
    for cell in [(0, 0), (1, 0), (1, 1), (1, 2), (3, 2), (2, 3), (3, 3)] {
        eater.set(cell);
    }
    let mut known = eater;
    known.erase((2, 3));
    known.erase((3, 3));

    let mut stable = LifeStable::new();
    stable.set_on(&known);
    stable.set_off(&!eater.big_zoi());

    let completed = stable.complete_stable(Duration::from_secs(5), false);
    assert!(!completed.is_empty());
    assert!(completed.contains(&known));
    assert_eq!(completed.step(), completed);
}
