use dfaequiv::{compare_graphs, load_graphs};
use std::env;
use std::path::PathBuf;
use std::process;

const USAGE: &str = "usage: dfaequiv [--dump] <FILE>";

struct Args {
    path: PathBuf,
    dump: bool,
}

fn parse_args() -> Option<Args> {
    let mut path = None;
    let mut dump = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--dump" => dump = true,
            s if s.starts_with('-') => return None,
            s if path.is_none() => path = Some(PathBuf::from(s)),
            _ => return None,
        }
    }

    Some(Args { path: path?, dump })
}

fn main() {
    env_logger::init();
    let args = match parse_args() {
        Some(args) => args,
        None => {
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    let dfas = match load_graphs(&args.path) {
        Ok(dfas) => dfas,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if args.dump {
        for dfa in &dfas {
            println!("{}", dfa);
        }
    }

    if let [first, second] = dfas.as_slice() {
        match compare_graphs(first, second) {
            Ok(verdict) => {
                if let Some(w) = &verdict.only_first {
                    println!("smallest non-empty string accepted by only first automaton:");
                    println!("{}", w);
                }
                if let Some(w) = &verdict.only_second {
                    println!("smallest non-empty string accepted by only second automaton:");
                    println!("{}", w);
                }
                println!("DFAs equivalent? {}", verdict.equivalent);
            }
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
    }
}
