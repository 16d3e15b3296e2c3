//! The command-line frontend: read a TOML configuration, run the search,
//! print the results.

use catsrc_lib::{Search, SearchConfig};
use clap::{arg, command};
use std::{fs, process::exit};

fn main() {
    env_logger::init();

    let matches = command!()
        .about("Searches for catalysts and oscillators in Conway's Game of Life")
        .arg(arg!(<CONFIG> "Path to a TOML configuration file"))
        .get_matches();

    let path = matches.get_one::<String>("CONFIG").unwrap();

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Could not read {path}: {e}");
            exit(1);
        }
    };

    let config: SearchConfig = match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Could not parse {path}: {e}");
            exit(1);
        }
    };

    let params = match config.compile() {
        Ok(params) => params,
        Err(e) => {
            eprintln!("Bad configuration: {e}");
            exit(1);
        }
    };

    let print_summary = params.print_summary;
    let mut search = Search::new(params);
    search.run();

    if print_summary {
        println!("All solutions:");
        search.print_summary();
    }
}
