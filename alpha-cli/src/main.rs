//! `alpha-reduce`: command-line front end for the alphabet-reduction core
//! (§6). Reads a `ProcessSpec` as JSON, runs one individually-selectable
//! algorithm over it, and writes the result back out.
use std::io::{Read, Write};
use std::path::PathBuf;

use argh::FromArgs;

use alpha_ir::{AllowSet, ProcessSpec};
use alpha_opt::{
    alphabet, alphabet_bounded, alphabet_efficient, alphabet_fixpoint, alphabet_fixpoint_restricted,
    alphabet_reduce, anonymize, classify_pcrl, eliminate_single_usage_equations,
    eliminate_trivial_equations, eliminate_unused_equations, is_pcrl, join_bisimilar_equations,
    process_info, remove_data_parameters, NoopSubstituter, PidGraph, ReduceOptions,
};
use alpha_utils::{AlphaResult, Error};

/// The full set of `--algorithm` choices (§6), in the order `--print-algorithms`
/// lists them.
const ALGORITHMS: &[&str] = &[
    "alphabet-reduce",
    "alphabet",
    "alphabet-efficient",
    "alphabet-new",
    "alphabet-bounded",
    "process-scc",
    "eliminate-trivial-equations",
    "eliminate-single-usage-equations",
    "eliminate-unused-equations",
    "join-bisimilar-equations",
    "process-info",
    "remove-data-parameters",
    "anonimyze",
];

#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help"))]
/// Reduce the alphabet of a process specification.
struct Opts {
    /// input file, JSON-encoded `ProcessSpec`; `-` or absent means stdin
    #[argh(positional)]
    file: Option<PathBuf>,

    /// output file; `-` or absent means stdout
    #[argh(option, short = 'o', long = "output", default = "String::from(\"-\")")]
    output: String,

    /// algorithm to run, see --print-algorithms for the full list
    #[argh(option, short = 'a', long = "algorithm")]
    algorithm: Option<String>,

    /// prints the full list of selectable algorithms and exits
    #[argh(switch, short = 'p', long = "print-algorithms")]
    print_algorithms: bool,

    /// a numeric parameter some algorithms accept (currently unused by the
    /// core; carried through for parity with the original CLI surface)
    #[argh(option, short = 'n', long = "number")]
    number: Option<u64>,

    /// an mCRL2 linearisation option string, passed through unexamined
    /// (§6 "linearisation option strings")
    #[argh(option, long = "linearisation-option")]
    linearisation_option: Vec<String>,

    /// log level (off, error, warn, info, debug, trace)
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    log_level: log::LevelFilter,

    /// above this many remaining equations, duplicate-equation merging is
    /// skipped (default 1000)
    #[argh(option, long = "duplicate-merge-threshold", default = "1000")]
    duplicate_merge_threshold: usize,

    /// search budget for AllowSet::subsets inside push_allow (default 1000)
    #[argh(option, long = "subsets-budget", default = "1000")]
    subsets_budget: usize,

    /// disable pushing communication through an outer allow set
    #[argh(switch, long = "no-push-comm-through-allow")]
    no_push_comm_through_allow: bool,

    /// lower bound for single-usage equation inlining (default 1)
    #[argh(option, long = "single-usage-lowerbound", default = "1")]
    single_usage_lowerbound: usize,
}

impl Opts {
    fn reduce_options(&self) -> ReduceOptions {
        ReduceOptions {
            duplicate_merge_threshold: self.duplicate_merge_threshold,
            subsets_budget: self.subsets_budget,
            push_comm_through_allow: !self.no_push_comm_through_allow,
            single_usage_lowerbound: self.single_usage_lowerbound,
        }
    }
}

fn read_spec(file: &Option<PathBuf>) -> AlphaResult<ProcessSpec> {
    let mut contents = String::new();
    match file {
        None => {
            std::io::stdin().read_to_string(&mut contents)?;
        }
        Some(path) if path.as_os_str() == "-" => {
            std::io::stdin().read_to_string(&mut contents)?;
        }
        Some(path) => {
            contents = std::fs::read_to_string(path)
                .map_err(|e| Error::invalid_file(format!("{}: {e}", path.display())))?;
        }
    }
    Ok(serde_json::from_str(&contents)?)
}

fn write_output(output: &str, contents: &str) -> AlphaResult<()> {
    if output == "-" {
        let mut stdout = std::io::stdout();
        stdout.write_all(contents.as_bytes())?;
        stdout.write_all(b"\n")?;
    } else {
        std::fs::write(output, contents).map_err(|e| Error::write_error(format!("{output}: {e}")))?;
    }
    Ok(())
}

/// Everything an algorithm might return; each variant picks its own
/// serialisation so the primary `ProcessSpec` format (§6) stays the
/// canonical round-trippable one while diagnostic algorithms emit
/// human-legible JSON scalars instead.
enum CliOutput {
    Spec(ProcessSpec),
    Json(serde_json::Value),
}

impl CliOutput {
    fn render(&self) -> AlphaResult<String> {
        match self {
            CliOutput::Spec(spec) => Ok(serde_json::to_string_pretty(spec)?),
            CliOutput::Json(value) => Ok(serde_json::to_string_pretty(value)?),
        }
    }
}

fn run_algorithm(name: &str, mut spec: ProcessSpec, options: ReduceOptions) -> AlphaResult<CliOutput> {
    match name {
        "alphabet-reduce" => Ok(CliOutput::Spec(alphabet_reduce(&spec, options)?)),
        "alphabet" => {
            let a = alphabet(&spec.initial, &spec);
            Ok(CliOutput::Json(serde_json::json!(
                alpha_ir::Printer::format_man_set(&a)
            )))
        }
        "alphabet-efficient" => {
            let cache = alphabet_fixpoint(&spec);
            let a = alphabet_efficient(&spec.initial, &cache);
            Ok(CliOutput::Json(serde_json::json!(
                alpha_ir::Printer::format_man_set(&a)
            )))
        }
        "alphabet-new" => {
            let classification = classify_pcrl(&spec);
            let graph = PidGraph::build(&spec);
            let roots = alpha_opt::analysis::find_process_identifiers(&spec.initial);
            let mut reachable = graph.reachable_from(&roots);
            reachable.extend(roots);
            let pcrl_reachable = spec
                .equations
                .iter()
                .map(|eq| eq.pid.clone())
                .filter(|pid| reachable.contains(pid) && is_pcrl(pid, &classification))
                .collect();
            let cache = alphabet_fixpoint_restricted(&spec, &pcrl_reachable);
            let a = alphabet_efficient(&spec.initial, &cache);
            Ok(CliOutput::Json(serde_json::json!(
                alpha_ir::Printer::format_man_set(&a)
            )))
        }
        "alphabet-bounded" => match &spec.initial {
            alpha_ir::ProcessExpr::Allow(v, body) => {
                let bound = AllowSet::from_mans(v.clone());
                let cache = alphabet_fixpoint(&spec);
                let result = alphabet_bounded(body, &bound, &cache);
                Ok(CliOutput::Json(serde_json::json!(
                    alpha_ir::Printer::format_allow_set(&result)
                )))
            }
            _ => Err(Error::misc(
                "alphabet-bounded requires an allow(...) expression at `init`",
            )),
        },
        "process-scc" => {
            let graph = PidGraph::build(&spec);
            let components: Vec<Vec<String>> = graph
                .sccs()
                .into_iter()
                .map(|c| c.into_iter().map(|pid| pid.name.to_string()).collect())
                .collect();
            Ok(CliOutput::Json(serde_json::json!({ "components": components })))
        }
        "eliminate-trivial-equations" => {
            eliminate_trivial_equations(&mut spec, &NoopSubstituter);
            Ok(CliOutput::Spec(spec))
        }
        "eliminate-single-usage-equations" => {
            eliminate_single_usage_equations(&mut spec, options.single_usage_lowerbound, &NoopSubstituter);
            Ok(CliOutput::Spec(spec))
        }
        "eliminate-unused-equations" => {
            eliminate_unused_equations(&mut spec);
            Ok(CliOutput::Spec(spec))
        }
        "join-bisimilar-equations" => {
            join_bisimilar_equations(&mut spec);
            Ok(CliOutput::Spec(spec))
        }
        "process-info" => {
            let info = process_info(&spec);
            Ok(CliOutput::Json(serde_json::to_value(info)?))
        }
        "remove-data-parameters" => {
            remove_data_parameters(&mut spec);
            Ok(CliOutput::Spec(spec))
        }
        "anonimyze" => {
            anonymize(&mut spec);
            Ok(CliOutput::Spec(spec))
        }
        other => Err(Error::misc(format!(
            "unknown algorithm {other:?}; see --print-algorithms"
        ))),
    }
}

fn run() -> AlphaResult<()> {
    let opts: Opts = argh::from_env();

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    if opts.print_algorithms {
        for name in ALGORITHMS {
            println!("{name}");
        }
        return Ok(());
    }

    if !opts.linearisation_option.is_empty() {
        log::info!(
            "ignoring {} linearisation option(s), not interpreted by the alphabet-reduction core",
            opts.linearisation_option.len()
        );
    }

    let algorithm = match (opts.algorithm.as_deref(), opts.number) {
        (Some(name), _) => name,
        (None, Some(n)) => *ALGORITHMS
            .get(n as usize)
            .ok_or_else(|| Error::misc(format!("--number={n} out of range (see --print-algorithms)")))?,
        (None, None) => {
            return Err(Error::misc(
                "--algorithm or --number is required (see --print-algorithms)",
            ))
        }
    };

    let spec = read_spec(&opts.file)?;
    let result = run_algorithm(algorithm, spec, opts.reduce_options())?;
    write_output(&opts.output, &result.render()?)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("alpha-reduce: {e}");
        std::process::exit(1);
    }
}
